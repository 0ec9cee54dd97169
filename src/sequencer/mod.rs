pub mod clock;
pub mod engine;
pub mod mixer;
pub mod pattern;

pub use clock::Tempo;
pub use engine::{Sequencer, SequencerConfig, SequencerState};
pub use mixer::DEFAULT_VOLUME;
pub use pattern::{PatternGrid, DEFAULT_STEPS, FILL_PRESETS};
