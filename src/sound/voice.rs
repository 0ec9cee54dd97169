use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use super::SoundHandle;

/// One-shot sample player. The sequencer drives it through `SoundHandle`,
/// the audio callback pulls samples from it with `render_into`. All state
/// is atomic so neither side ever waits on the other.
pub struct SampleVoice {
    sample_rate: f32,
    buffer: Arc<[f32]>, // mono f32 sample data at `sample_rate`
    /// Read position in frames
    position: AtomicUsize,
    playing: AtomicBool,
    /// f32 gain stored as bits
    gain: AtomicU32,
}

impl SampleVoice {
    pub fn new(buffer: Vec<f32>, sample_rate: f32) -> Self {
        Self {
            sample_rate,
            buffer: buffer.into(),
            position: AtomicUsize::new(0),
            playing: AtomicBool::new(false),
            gain: AtomicU32::new(0.5f32.to_bits()),
        }
    }

    pub fn from_wav(path: &Path, sample_rate: f32) -> Result<Self> {
        Ok(Self::new(load_wav(path, sample_rate)?, sample_rate))
    }

    pub fn len_frames(&self) -> usize {
        self.buffer.len()
    }

    /// Mix this voice into `out` (mono)
    pub fn render_into(&self, out: &mut [f32]) {
        if !self.playing.load(Ordering::Acquire) {
            return;
        }
        let gain = f32::from_bits(self.gain.load(Ordering::Relaxed));
        let start = self.position.load(Ordering::Acquire);

        let mut pos = start;
        for sample in out.iter_mut() {
            let Some(value) = self.buffer.get(pos) else {
                break;
            };
            *sample += value * gain;
            pos += 1;
        }

        // A seek made while rendering wins over the advanced position
        let advanced = self
            .position
            .compare_exchange(start, pos, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok();
        if advanced && pos >= self.buffer.len() {
            self.playing.store(false, Ordering::Release);
        }
    }
}

impl SoundHandle for SampleVoice {
    fn play(&self) {
        self.playing.store(true, Ordering::Release);
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::Release);
    }

    fn set_position(&self, secs: f64) {
        let frames = (secs.max(0.0) * self.sample_rate as f64).floor() as usize;
        self.position.store(frames, Ordering::Release);
    }

    fn set_volume(&self, gain: f32) {
        self.gain
            .store(gain.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

/// Load a WAV file as mono f32, resampled to target sample rate
pub fn load_wav(path: &Path, target_sr: f32) -> Result<Vec<f32>> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV: {}", path.display()))?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    let wav_sr = spec.sample_rate as f32;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .filter_map(|s| s.ok())
                .map(|s| s as f32 / max_val)
                .collect()
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .filter_map(|s| s.ok())
            .collect(),
    };

    if samples.is_empty() {
        bail!("WAV file is empty: {}", path.display());
    }

    let mono: Vec<f32> = if channels > 1 {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    } else {
        samples
    };

    if (wav_sr - target_sr).abs() > 1.0 {
        Ok(resample_linear(&mono, wav_sr, target_sr))
    } else {
        Ok(mono)
    }
}

fn resample_linear(input: &[f32], from_sr: f32, to_sr: f32) -> Vec<f32> {
    let ratio = from_sr as f64 / to_sr as f64;
    let new_len = (input.len() as f64 / ratio) as usize;
    (0..new_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            let s0 = input.get(idx).copied().unwrap_or(0.0);
            let s1 = input.get(idx + 1).copied().unwrap_or(s0);
            s0 + (s1 - s0) * frac
        })
        .collect()
}
