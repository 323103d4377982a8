//! # Notewell OT
//!
//! Operational-transformation primitives for note synchronization.

pub mod apply;
pub mod op;
pub mod transform;

pub use apply::apply;
pub use op::{coalesce, ops_from_diff, Op};
pub use transform::transform;

/// Operation execution error
#[derive(Debug, Clone, thiserror::Error)]
pub enum OtError {
    #[error("operation position {position} lands outside content of length {len}")]
    PositionOutOfBounds { position: usize, len: usize },
    #[error("delete of {length} at position {position} crosses end of content (length {len})")]
    RangeOutOfBounds {
        position: usize,
        length: usize,
        len: usize,
    },
}
