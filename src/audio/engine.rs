use std::sync::Arc;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig, SupportedStreamConfig};

use crate::sound::SampleVoice;

/// Default output device, opened but not yet streaming. The kit is decoded
/// at `sample_rate()` before the stream starts.
pub struct AudioOutput {
    device: Device,
    config: SupportedStreamConfig,
}

impl AudioOutput {
    pub fn open_default() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No output device available")?;
        let config = device
            .default_output_config()
            .context("No default output config")?;
        log::info!(
            "Audio output: {} @ {} Hz, {} channels, {:?}",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            config.sample_rate().0,
            config.channels(),
            config.sample_format()
        );
        Ok(Self { device, config })
    }

    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate().0 as f32
    }

    /// Start streaming the mix of all voices
    pub fn start(self, voices: Vec<Arc<SampleVoice>>) -> Result<AudioEngine> {
        let stream_config: StreamConfig = self.config.clone().into();
        let stream = match self.config.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&self.device, &stream_config, voices)?,
            SampleFormat::I16 => build_stream::<i16>(&self.device, &stream_config, voices)?,
            SampleFormat::U16 => build_stream::<u16>(&self.device, &stream_config, voices)?,
            format => anyhow::bail!("Unsupported sample format: {:?}", format),
        };
        stream.play().context("Failed to start audio stream")?;
        Ok(AudioEngine { _stream: stream })
    }
}

/// Keeps the output stream alive
pub struct AudioEngine {
    _stream: Stream,
}

/// Build the audio stream for a specific sample format
fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    voices: Vec<Arc<SampleVoice>>,
) -> Result<Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut mix: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let frames = data.len() / channels.max(1);
            mix.clear();
            mix.resize(frames, 0.0);
            for voice in &voices {
                voice.render_into(&mut mix);
            }

            for (frame, sample) in data.chunks_mut(channels).zip(&mix) {
                let value = T::from_sample(soft_clip(*sample));
                for channel_sample in frame.iter_mut() {
                    *channel_sample = value;
                }
            }
        },
        |err| {
            log::error!("Audio stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}

/// Soft clipping function to prevent harsh digital clipping
fn soft_clip(x: f32) -> f32 {
    if x > 1.0 {
        1.0 - (-x + 1.0).exp() * 0.5
    } else if x < -1.0 {
        -1.0 + (x + 1.0).exp() * 0.5
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_clip_passes_through_in_range() {
        assert_eq!(soft_clip(0.3), 0.3);
        assert_eq!(soft_clip(-1.0), -1.0);
    }

    #[test]
    fn soft_clip_bounds_overshoot() {
        let y = soft_clip(3.0);
        assert!(y > 0.5 && y < 1.0);
        let y = soft_clip(-3.0);
        assert!(y < -0.5 && y > -1.0);
    }
}
