//! Error types surfaced to the verification layer
//!
//! The pipeline itself has no notion of retry; every variant here is a hard
//! failure that invalidates the run.

use thiserror::Error;

/// Result type for verification-layer operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Hard failures observable at the streaming boundary
#[derive(Debug, Error)]
pub enum PipelineError {
    /// `valid` retracted or `data` mutated while a beat was stalled
    #[error("protocol violation at tick {tick}: {detail}")]
    ProtocolViolation { tick: usize, detail: String },

    /// A produced beat differs from the reference product
    #[error("mismatch at beat {beat}, lane {lane}: expected {expected}, got {actual}")]
    Mismatch {
        beat: usize,
        lane: usize,
        expected: i64,
        actual: i64,
    },

    /// No output beat within the tick budget after input was presented
    #[error("no output beat within {ticks} ticks")]
    Timeout { ticks: usize },

    /// Stimulus matrices do not fit the configured grid
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },
}

impl PipelineError {
    pub fn protocol(tick: usize, detail: impl Into<String>) -> Self {
        PipelineError::ProtocolViolation {
            tick,
            detail: detail.into(),
        }
    }

    pub fn shape(expected: impl Into<String>, got: impl Into<String>) -> Self {
        PipelineError::ShapeMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }
}
