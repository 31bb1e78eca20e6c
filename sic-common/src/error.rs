//! Error kinds for the intern table and sharded pool.
//!
//! ## Design Principles
//!
//! 1. **Three Kinds Only**: argument errors, concurrent-modification,
//!    and transcoding failures — interning itself cannot otherwise fail.
//! 2. **Fatal To The Call**: none of these are retried internally; the
//!    caller decides whether to retry, fall back, or propagate.

use crate::encoding::TranscodeError;

/// Result alias used throughout the intern table and sharded pool.
pub type InternResult<T> = Result<T, InternError>;

/// Errors the intern table and sharded pool can raise.
#[derive(Debug, thiserror::Error)]
pub enum InternError {
    /// Invalid capacity, `max_count`, `max_length`, or a null argument
    /// where the contract requires a value.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Human-readable description of what was invalid.
        reason: &'static str,
    },

    /// A hash-chain walk exceeded table capacity, meaning a self-loop
    /// has formed — the table was accessed from more than one thread
    /// without the sharded pool's lock.
    #[error("concurrent modification detected (hash chain exceeded table capacity)")]
    ConcurrentModification,

    /// Propagated unchanged from the byte-decoding layer.
    #[error("transcoding failed: {0}")]
    Transcode(#[from] TranscodeError),
}

impl InternError {
    /// Shorthand for the common "invalid argument" case.
    pub fn invalid_argument(reason: &'static str) -> Self {
        InternError::InvalidArgument { reason }
    }
}
