//! Shared utility helpers.

pub mod error;
pub(crate) mod math;

pub use error::{AbortReason, GraspError, GraspResult};
pub use math::ROTATION_TOLERANCE;
