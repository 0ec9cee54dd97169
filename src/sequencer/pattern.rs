use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SequencerError;
use crate::sound::Sound;

pub const DEFAULT_STEPS: usize = 16;

/// Fill shortcuts as (divisor, offset variant). The variant is what the
/// shifted key selects; divisor 1 has no variant.
pub const FILL_PRESETS: [(usize, Option<usize>); 4] =
    [(1, None), (2, Some(1)), (4, Some(2)), (8, Some(4))];

/// The sequencer board: one row of steps per sound, keyed by sound name.
/// Rows for names outside the kit can exist after loading an old preset;
/// playback never visits them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternGrid {
    width: usize,
    rows: BTreeMap<String, Vec<bool>>,
}

impl PatternGrid {
    /// All-off grid with exactly one row per sound
    pub fn new(sounds: &[Sound], width: usize) -> Self {
        Self::from_names(sounds.iter().map(|s| s.name.as_str()), width)
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>, width: usize) -> Self {
        let width = width.max(1);
        Self {
            width,
            rows: names
                .into_iter()
                .map(|name| (name.to_string(), vec![false; width]))
                .collect(),
        }
    }

    /// Same as `new`
    pub fn reset(sounds: &[Sound], width: usize) -> Self {
        Self::new(sounds, width)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row(&self, name: &str) -> Option<&[bool]> {
        self.rows.get(name).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[bool])> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_active(&self, name: &str, step: usize) -> bool {
        self.row(name)
            .and_then(|row| row.get(step).copied())
            .unwrap_or(false)
    }

    /// Returns true if any step of any row is on
    pub fn has_content(&self) -> bool {
        self.rows.values().any(|row| row.iter().any(|&on| on))
    }

    fn row_mut(&mut self, name: &str) -> Result<&mut Vec<bool>, SequencerError> {
        self.rows
            .get_mut(name)
            .ok_or_else(|| SequencerError::UnknownSound(name.to_string()))
    }

    /// Flip one cell. Returns the new value.
    pub fn toggle(&mut self, name: &str, step: usize) -> Result<bool, SequencerError> {
        let width = self.width;
        if step >= width {
            return Err(SequencerError::StepOutOfRange { step, width });
        }
        let row = self.row_mut(name)?;
        row[step] = !row[step];
        Ok(row[step])
    }

    /// Set every `divisor`-th step starting at `offset`. Pressing the same
    /// fill again on an unchanged row clears it.
    pub fn fill_pattern(
        &mut self,
        name: &str,
        divisor: usize,
        offset: usize,
    ) -> Result<(), SequencerError> {
        let generated = fill_row(self.width, divisor, offset)?;
        let row = self.row_mut(name)?;
        if *row == generated {
            row.iter_mut().for_each(|step| *step = false);
        } else {
            *row = generated;
        }
        Ok(())
    }

    pub fn clear_row(&mut self, name: &str) -> Result<(), SequencerError> {
        self.row_mut(name)?.iter_mut().for_each(|step| *step = false);
        Ok(())
    }

    /// Adopt a loaded grid for the current kit and width. Rows are resized,
    /// missing sounds get empty rows, rows for unknown sounds are kept.
    pub fn conform(mut snapshot: PatternGrid, sounds: &[Sound], width: usize) -> Self {
        let width = width.max(1);
        for row in snapshot.rows.values_mut() {
            row.resize(width, false);
        }
        for sound in sounds {
            snapshot
                .rows
                .entry(sound.name.clone())
                .or_insert_with(|| vec![false; width]);
        }
        for name in snapshot.rows.keys() {
            if !sounds.iter().any(|s| &s.name == name) {
                log::warn!("{}", SequencerError::StaleReference(name.clone()));
            }
        }
        snapshot.width = width;
        snapshot
    }
}

/// Row where step i is on iff `i % divisor == offset`
pub fn fill_row(width: usize, divisor: usize, offset: usize) -> Result<Vec<bool>, SequencerError> {
    if divisor == 0 {
        return Err(SequencerError::InvalidDivisor);
    }
    Ok((0..width).map(|i| i % divisor == offset).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> PatternGrid {
        PatternGrid::from_names(["kick", "snare", "hat"], 16)
    }

    fn on_steps(row: &[bool]) -> Vec<usize> {
        row.iter()
            .enumerate()
            .filter_map(|(i, &on)| on.then_some(i))
            .collect()
    }

    #[test]
    fn new_grid_is_all_off() {
        let g = grid();
        assert_eq!(g.rows().count(), 3);
        for (_, row) in g.rows() {
            assert_eq!(row.len(), 16);
            assert!(row.iter().all(|&on| !on));
        }
        assert!(!g.has_content());
    }

    #[test]
    fn toggle_flips_one_cell() {
        let mut g = grid();
        assert_eq!(g.toggle("snare", 4), Ok(true));
        assert!(g.is_active("snare", 4));
        assert!(!g.is_active("snare", 5));
        assert!(!g.is_active("kick", 4));
        assert_eq!(g.toggle("snare", 4), Ok(false));
        assert!(!g.has_content());
    }

    #[test]
    fn toggle_rejects_bad_references() {
        let mut g = grid();
        let before = g.clone();
        assert_eq!(
            g.toggle("cowbell", 0),
            Err(SequencerError::UnknownSound("cowbell".into()))
        );
        assert_eq!(
            g.toggle("kick", 16),
            Err(SequencerError::StepOutOfRange { step: 16, width: 16 })
        );
        assert_eq!(g, before);
    }

    #[test]
    fn quarter_fill_hits_downbeats() {
        let mut g = grid();
        g.fill_pattern("kick", 4, 0).unwrap();
        assert_eq!(on_steps(g.row("kick").unwrap()), vec![0, 4, 8, 12]);
    }

    #[test]
    fn offset_fill_hits_offbeats() {
        let mut g = grid();
        g.fill_pattern("hat", 8, 4).unwrap();
        assert_eq!(on_steps(g.row("hat").unwrap()), vec![4, 12]);
    }

    #[test]
    fn second_identical_fill_clears_row() {
        let mut g = grid();
        g.fill_pattern("kick", 2, 1).unwrap();
        g.fill_pattern("kick", 2, 1).unwrap();
        assert!(g.row("kick").unwrap().iter().all(|&on| !on));
    }

    #[test]
    fn different_fill_replaces_row() {
        let mut g = grid();
        g.fill_pattern("kick", 1, 0).unwrap();
        g.fill_pattern("kick", 4, 2).unwrap();
        assert_eq!(on_steps(g.row("kick").unwrap()), vec![2, 6, 10, 14]);
    }

    #[test]
    fn fill_over_hand_edited_row_sets_pattern() {
        let mut g = grid();
        g.toggle("kick", 0).unwrap();
        g.toggle("kick", 1).unwrap();
        g.fill_pattern("kick", 4, 0).unwrap();
        assert_eq!(on_steps(g.row("kick").unwrap()), vec![0, 4, 8, 12]);
    }

    #[test]
    fn zero_divisor_is_rejected() {
        let mut g = grid();
        assert_eq!(g.fill_pattern("kick", 0, 0), Err(SequencerError::InvalidDivisor));
    }

    #[test]
    fn conform_resizes_and_keeps_stale_rows() {
        let mut old = PatternGrid::from_names(["kick", "clap"], 8);
        old.toggle("kick", 7).unwrap();
        old.toggle("clap", 0).unwrap();

        let g = PatternGrid::conform(old, &[], 16);
        assert_eq!(g.width(), 16);
        assert!(g.is_active("kick", 7));
        assert!(!g.is_active("kick", 15));
        assert_eq!(g.row("clap").map(<[bool]>::len), Some(16));
    }

    #[test]
    fn unknown_row_reads_as_none() {
        let g = grid();
        assert!(g.row("cowbell").is_none());
        assert!(!g.is_active("cowbell", 0));
    }
}
