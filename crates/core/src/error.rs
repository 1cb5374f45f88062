//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Only covers failures the in-memory stores can produce. Transport concerns
/// (status codes, challenges) belong to the API layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested record was not found.
    #[error("not found")]
    NotFound,

    /// A record with the same identifier already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The storage handle is unusable (a writer panicked while holding the lock).
    #[error("storage unavailable")]
    Unavailable,
}

impl DomainError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
