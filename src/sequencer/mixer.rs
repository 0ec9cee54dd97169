use crate::error::SequencerError;
use crate::sound::Sound;

pub const DEFAULT_VOLUME: f32 = 0.5;

/// Per-sound volume and mute, indexed like the kit
#[derive(Clone, Debug, PartialEq)]
pub struct MixState {
    volumes: Vec<f32>,
    mutes: Vec<bool>,
}

impl MixState {
    /// `initial` supplies starting volumes in kit order; missing or invalid
    /// entries fall back to DEFAULT_VOLUME
    pub fn new(sound_count: usize, initial: &[Option<f32>]) -> Self {
        let volumes = (0..sound_count)
            .map(|i| {
                initial
                    .get(i)
                    .copied()
                    .flatten()
                    .filter(|v| v.is_finite())
                    .map_or(DEFAULT_VOLUME, |v| v.clamp(0.0, 1.0))
            })
            .collect();
        Self {
            volumes,
            mutes: vec![false; sound_count],
        }
    }

    pub fn volumes(&self) -> &[f32] {
        &self.volumes
    }

    pub fn mutes(&self) -> &[bool] {
        &self.mutes
    }

    pub fn volume(&self, idx: usize) -> Option<f32> {
        self.volumes.get(idx).copied()
    }

    pub fn is_muted(&self, idx: usize) -> bool {
        self.mutes.get(idx).copied().unwrap_or(false)
    }

    fn check(&self, idx: usize) -> Result<(), SequencerError> {
        if idx < self.volumes.len() {
            Ok(())
        } else {
            Err(SequencerError::TrackOutOfRange {
                index: idx,
                len: self.volumes.len(),
            })
        }
    }

    /// Set a volume, clamped into [0, 1]. Returns the stored value.
    pub fn set_volume(&mut self, idx: usize, value: f32) -> Result<f32, SequencerError> {
        self.check(idx)?;
        if !value.is_finite() {
            return Err(SequencerError::InvalidVolume(value));
        }
        let v = value.clamp(0.0, 1.0);
        self.volumes[idx] = v;
        Ok(v)
    }

    pub fn nudge_volume(&mut self, idx: usize, delta: f32) -> Result<f32, SequencerError> {
        self.check(idx)?;
        self.set_volume(idx, self.volumes[idx] + delta)
    }

    /// Double-click reset
    pub fn reset_volume(&mut self, idx: usize) -> Result<f32, SequencerError> {
        self.set_volume(idx, DEFAULT_VOLUME)
    }

    pub fn toggle_mute(&mut self, idx: usize) -> Result<bool, SequencerError> {
        self.check(idx)?;
        self.mutes[idx] = !self.mutes[idx];
        Ok(self.mutes[idx])
    }

    /// Adopt saved volumes, fitted to the kit size. Mutes are untouched.
    pub fn replace_volumes(&mut self, volumes: &[f32]) {
        let fitted: Vec<Option<f32>> = volumes.iter().map(|v| Some(*v)).collect();
        self.volumes = MixState::new(self.volumes.len(), &fitted).volumes;
    }

    /// Push every volume to its sound's playback gain
    pub fn apply_volumes(&self, sounds: &[Sound]) {
        for (sound, volume) in sounds.iter().zip(&self.volumes) {
            sound.handle.set_volume(*volume);
        }
    }
}
