use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SequencerError;

pub const MIN_BPM: u32 = 1;
pub const MAX_BPM: u32 = 300;
pub const DEFAULT_BPM: u32 = 120;

/// Beats per minute, always within [MIN_BPM, MAX_BPM]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Tempo(u32);

impl Tempo {
    pub fn new(bpm: u32) -> Self {
        Self(bpm.clamp(MIN_BPM, MAX_BPM))
    }

    /// Clamp any finite value into range (0 and negatives become MIN_BPM)
    pub fn from_f64(bpm: f64) -> Result<Self, SequencerError> {
        if !bpm.is_finite() {
            return Err(SequencerError::InvalidTempo(bpm.to_string()));
        }
        let clamped = bpm.round().clamp(MIN_BPM as f64, MAX_BPM as f64);
        Ok(Self(clamped as u32))
    }

    /// Parse user-typed tempo
    pub fn parse(text: &str) -> Result<Self, SequencerError> {
        let trimmed = text.trim();
        let bpm: f64 = trimmed
            .parse()
            .map_err(|_| SequencerError::InvalidTempo(trimmed.to_string()))?;
        Self::from_f64(bpm)
    }

    pub fn bpm(self) -> u32 {
        self.0
    }

    pub fn offset(self, delta: i32) -> Self {
        Self::new((self.0 as i64 + delta as i64).max(0) as u32)
    }

    /// One step is an eighth note: 60 / (bpm * 2) seconds
    pub fn step_period(self) -> Duration {
        Duration::from_secs_f64(60.0 / (self.0 as f64 * 2.0))
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(DEFAULT_BPM)
    }
}

impl From<u32> for Tempo {
    fn from(bpm: u32) -> Self {
        Self::new(bpm)
    }
}

impl From<Tempo> for u32 {
    fn from(tempo: Tempo) -> Self {
        tempo.0
    }
}

/// What one tick decided: the column to play and the mutes in force for it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickFrame {
    pub step: usize,
    pub mutes: Vec<bool>,
}

/// Play state and playhead position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportState {
    playing: bool,
    current_step: usize,
    /// Column fired by the latest tick, the one the UI highlights
    playhead: Option<usize>,
    mute_snapshot: Vec<bool>,
    width: usize,
}

impl TransportState {
    pub fn new(width: usize) -> Self {
        Self {
            playing: false,
            current_step: 0,
            playhead: None,
            mute_snapshot: Vec::new(),
            width: width.max(1),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn playhead(&self) -> Option<usize> {
        self.playhead
    }

    pub fn mute_snapshot(&self) -> &[bool] {
        &self.mute_snapshot
    }

    /// Stopped -> Playing, rewound to step 0. Returns false if already playing.
    pub fn start(&mut self) -> bool {
        if self.playing {
            return false;
        }
        self.playing = true;
        self.current_step = 0;
        self.playhead = None;
        true
    }

    /// Playing -> Stopped. The step stays where it was.
    pub fn stop(&mut self) -> bool {
        let was_playing = self.playing;
        self.playing = false;
        was_playing
    }

    /// Stop and rewind to step 0
    pub fn reset(&mut self) {
        self.playing = false;
        self.current_step = 0;
        self.playhead = None;
    }

    /// Take the current column and advance past it, recording the mutes
    /// the column will be played with. None while stopped.
    pub fn advance(&mut self, mutes: &[bool]) -> Option<TickFrame> {
        if !self.playing {
            return None;
        }
        let step = self.current_step;
        self.current_step = (step + 1) % self.width;
        self.playhead = Some(step);
        self.mute_snapshot.clear();
        self.mute_snapshot.extend_from_slice(mutes);
        Some(TickFrame {
            step,
            mutes: self.mute_snapshot.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_bounds_give_positive_periods() {
        assert_eq!(Tempo::new(1).step_period(), Duration::from_secs(30));
        assert_eq!(Tempo::new(300).step_period(), Duration::from_millis(100));
        assert_eq!(Tempo::new(120).step_period(), Duration::from_millis(250));
    }

    #[test]
    fn non_positive_tempo_clamps_to_one() {
        assert_eq!(Tempo::new(0).bpm(), 1);
        assert_eq!(Tempo::from_f64(-40.0).unwrap().bpm(), 1);
        assert_eq!(Tempo::parse("0").unwrap().bpm(), 1);
        assert!(Tempo::parse("0").unwrap().step_period() > Duration::ZERO);
    }

    #[test]
    fn tempo_above_range_clamps() {
        assert_eq!(Tempo::new(999).bpm(), 300);
        assert_eq!(Tempo::parse(" 450.7 ").unwrap().bpm(), 300);
    }

    #[test]
    fn garbage_tempo_is_rejected() {
        assert!(matches!(Tempo::parse("fast"), Err(SequencerError::InvalidTempo(_))));
        assert!(matches!(Tempo::parse("NaN"), Err(SequencerError::InvalidTempo(_))));
        assert!(matches!(Tempo::parse("inf"), Err(SequencerError::InvalidTempo(_))));
    }

    #[test]
    fn tempo_offset_saturates() {
        assert_eq!(Tempo::new(5).offset(-10).bpm(), 1);
        assert_eq!(Tempo::new(295).offset(10).bpm(), 300);
    }

    #[test]
    fn tempo_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Tempo::new(98)).unwrap(), "98");
        let t: Tempo = serde_json::from_str("0").unwrap();
        assert_eq!(t.bpm(), 1);
    }

    #[test]
    fn advance_wraps_and_records_playhead() {
        let mut t = TransportState::new(4);
        assert!(t.start());
        let steps: Vec<usize> = (0..6).map(|_| t.advance(&[]).unwrap().step).collect();
        assert_eq!(steps, vec![0, 1, 2, 3, 0, 1]);
        assert_eq!(t.current_step(), 2);
        assert_eq!(t.playhead(), Some(1));
    }

    #[test]
    fn stopped_transport_does_not_advance() {
        let mut t = TransportState::new(16);
        assert_eq!(t.advance(&[false]), None);
        assert_eq!(t.current_step(), 0);
    }

    #[test]
    fn stop_freezes_and_start_rewinds() {
        let mut t = TransportState::new(16);
        t.start();
        for _ in 0..5 {
            t.advance(&[]);
        }
        assert!(t.stop());
        assert_eq!(t.current_step(), 5);
        assert_eq!(t.advance(&[]), None);
        assert_eq!(t.current_step(), 5);

        assert!(t.start());
        assert_eq!(t.current_step(), 0);
        assert_eq!(t.playhead(), None);
    }

    #[test]
    fn advance_snapshots_mutes() {
        let mut t = TransportState::new(16);
        t.start();
        let frame = t.advance(&[true, false]).unwrap();
        assert_eq!(frame.mutes, vec![true, false]);
        assert_eq!(t.mute_snapshot(), &[true, false]);
    }
}
