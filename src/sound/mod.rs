pub mod kit;
pub mod voice;

use std::sync::Arc;

pub use kit::{find_kit_dir, home_dir, load_kit, KitManifest};
pub use voice::SampleVoice;

/// Playback controls the sequencer needs from a sound. Implementations use
/// interior mutability since the timer thread and the UI share them.
pub trait SoundHandle: Send + Sync {
    fn play(&self);
    fn pause(&self);
    /// Seek to a position in seconds from the start of the sample
    fn set_position(&self, secs: f64);
    /// Output gain, 0.0-1.0
    fn set_volume(&self, gain: f32);
    /// Hint that the sound will be triggered soon
    fn preload(&self) {}
}

/// A named, playable sample. Fixed for the whole session.
#[derive(Clone)]
pub struct Sound {
    pub name: String,
    pub credit_url: String,
    /// Seconds into the sample where playback starts
    pub trigger_offset: f64,
    /// Display color tag, e.g. "red" or "#ff8800"
    pub color: String,
    pub handle: Arc<dyn SoundHandle>,
}

impl Sound {
    pub fn new(name: impl Into<String>, handle: Arc<dyn SoundHandle>) -> Self {
        Self {
            name: name.into(),
            credit_url: String::new(),
            trigger_offset: 0.0,
            color: String::from("white"),
            handle,
        }
    }

    pub fn with_trigger_offset(mut self, secs: f64) -> Self {
        self.trigger_offset = secs.max(0.0);
        self
    }

    pub fn with_credit(mut self, url: impl Into<String>) -> Self {
        self.credit_url = url.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Silence the sound and rewind it to its trigger offset
    pub fn rewind(&self) {
        self.handle.pause();
        self.handle.set_position(self.trigger_offset);
    }

    /// Start playback from the trigger offset
    pub fn trigger(&self) {
        self.handle.set_position(self.trigger_offset);
        self.handle.play();
    }
}

impl std::fmt::Debug for Sound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sound")
            .field("name", &self.name)
            .field("trigger_offset", &self.trigger_offset)
            .field("color", &self.color)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::testing::{Call, RecordingHandle};
    use super::*;

    #[test]
    fn rewind_pauses_then_seeks_to_offset() {
        let handle = Arc::new(RecordingHandle::default());
        let sound = Sound::new("kick", handle.clone()).with_trigger_offset(0.02);
        sound.rewind();
        assert_eq!(handle.calls(), vec![Call::Pause, Call::Seek(0.02)]);
    }

    #[test]
    fn negative_trigger_offset_is_zeroed() {
        let handle = Arc::new(RecordingHandle::default());
        let sound = Sound::new("snare", handle).with_trigger_offset(-1.0);
        assert_eq!(sound.trigger_offset, 0.0);
    }
}
