use thiserror::Error;

/// Errors raised by the sequencing core. All of them are recoverable:
/// callers turn them into a status message and leave state unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequencerError {
    #[error("unknown sound '{0}'")]
    UnknownSound(String),

    #[error("step {step} out of range (grid has {width} steps)")]
    StepOutOfRange { step: usize, width: usize },

    #[error("track {index} out of range ({len} tracks)")]
    TrackOutOfRange { index: usize, len: usize },

    #[error("pattern divisor must be at least 1")]
    InvalidDivisor,

    #[error("invalid tempo '{0}'")]
    InvalidTempo(String),

    #[error("invalid volume {0}")]
    InvalidVolume(f32),

    #[error("no preset at index {0}")]
    PresetNotFound(usize),

    #[error("pattern references unknown sound '{0}'")]
    StaleReference(String),
}

impl SequencerError {
    /// Bad sound, step, track or divisor reference
    pub fn is_invalid_index(&self) -> bool {
        matches!(
            self,
            SequencerError::UnknownSound(_)
                | SequencerError::StepOutOfRange { .. }
                | SequencerError::TrackOutOfRange { .. }
                | SequencerError::InvalidDivisor
        )
    }
}
