//! Error types for the protocol crate.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding envelopes.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The payload is not valid JSON, or not the expected JSON shape.
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// A field required by the message type is absent.
    #[error("{message} envelope is missing `{field}`")]
    MissingField {
        /// Wire name of the message type.
        message: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field has the wrong JSON type.
    #[error("`{field}` must be a {expected}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Expected JSON type.
        expected: &'static str,
    },

    /// The message type is not one this peer understands.
    #[error("unrecognized message type: {0}")]
    UnrecognizedMessage(String),

    /// The sync direction token is not `out`, `in` or `both`.
    #[error("invalid sync direction: {0}")]
    InvalidDirection(String),

    /// The origin is not a UUID.
    #[error("invalid peer id: {0}")]
    InvalidPeerId(String),

    /// The snapshot carried by a sync message is not a string map.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

impl ProtocolError {
    /// Returns true if the envelope was well-formed but names a message
    /// type this peer does not handle.
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, ProtocolError::UnrecognizedMessage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_is_distinct() {
        assert!(ProtocolError::UnrecognizedMessage("ping".into()).is_unrecognized());
        assert!(!ProtocolError::InvalidDirection("up".into()).is_unrecognized());
    }

    #[test]
    fn error_display() {
        let err = ProtocolError::MissingField {
            message: "setItem",
            field: "key",
        };
        assert_eq!(err.to_string(), "setItem envelope is missing `key`");
    }
}
