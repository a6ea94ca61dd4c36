//! Error types for graspick.

use std::fmt;
use thiserror::Error;

/// Result alias for graspick operations.
pub type GraspResult<T> = std::result::Result<T, GraspError>;

/// Why an interactive selection ended without a chosen grasp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// The input source reached end of input.
    InputClosed,
    /// Every allowed prompt was answered with an unknown tag.
    PromptsExhausted,
    /// The render surface stayed open past the configured poll limit.
    PollLimitReached,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AbortReason::InputClosed => "input closed",
            AbortReason::PromptsExhausted => "prompt retries exhausted",
            AbortReason::PollLimitReached => "render poll limit reached",
        };
        f.write_str(text)
    }
}

/// Errors that can occur while filtering, selecting, or recording grasps.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GraspError {
    /// Fewer candidates survived than the operation requires.
    #[error("insufficient candidates: need {required}, have {available}")]
    InsufficientCandidates { required: usize, available: usize },
    /// The typed tag does not name any presented candidate.
    #[error("unknown selection tag: {0:?}")]
    UnknownSelectionTag(String),
    /// Collision filtering was requested but no usable detector answered.
    #[error("collision service unavailable: {0}")]
    CollisionServiceUnavailable(String),
    /// The grasp log could not be appended to.
    #[error("persistence write failed: {0}")]
    PersistenceWriteFailure(String),
    /// The relay transport rejected the payload.
    #[error("relay failed: {0}")]
    RelayFailure(String),
    /// A rotation matrix is not a proper rotation.
    #[error("rotation is not orthonormal (det = {determinant})")]
    NonOrthonormalRotation { determinant: f32 },
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Index was outside the valid range.
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },
    /// A persisted or loaded record could not be parsed.
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
    /// Selection ended without a chosen candidate.
    #[error("selection aborted: {0}")]
    SelectionAborted(AbortReason),
    /// Underlying I/O failure outside the log and relay paths.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for GraspError {
    fn from(err: std::io::Error) -> Self {
        GraspError::Io(err.to_string())
    }
}
