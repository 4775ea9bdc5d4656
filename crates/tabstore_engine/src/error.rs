//! Error types for the sync engine.

use tabstore_protocol::ProtocolError;
use tabstore_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur inside the sync engine.
///
/// None of these reach callers of the store surface; they are logged and
/// the operation degrades to a missed synchronization.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The session store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// An envelope could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The broadcast primitive failed.
    #[error("broadcast error: {0}")]
    Broadcast(String),
}

impl SyncError {
    /// Creates a broadcast error.
    pub fn broadcast(message: impl Into<String>) -> Self {
        Self::Broadcast(message.into())
    }
}
