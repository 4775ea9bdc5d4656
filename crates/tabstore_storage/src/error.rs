//! Error types for session store operations.

use thiserror::Error;

/// Result type for session store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during session store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The store is not available in this context.
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected a write.
    #[error("session store is read-only")]
    ReadOnly,

    /// The host store reported an error.
    #[error("session store error: {0}")]
    Backend(String),
}
