//! Error types for the index core.

use thiserror::Error;

/// Errors surfaced by the indexing core.
///
/// Absence (an unknown transaction or block id) is reported as `Option::None`
/// by the lookup in question, never as an error.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A pagination cursor did not decode to valid JSON of the expected arity.
    /// Surfaced to the caller as a validation failure; never retried.
    #[error("bad cursor: {0}")]
    BadCursor(String),

    /// A caller-supplied argument failed validation (negative height,
    /// malformed base64 identifier, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An underlying storage-engine error. The enclosing transaction has
    /// been rolled back; the caller may retry.
    #[error("storage error: {0}")]
    Storage(String),
}

impl IndexError {
    /// Returns `true` if the operation may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
