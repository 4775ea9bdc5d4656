//! Sync direction tokens.

use crate::error::{ProtocolError, ProtocolResult};
use std::fmt;
use std::str::FromStr;

/// Direction of a sync request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncDirection {
    /// Push the sender's state to peers.
    Out,
    /// Ask peers to push their state to the sender.
    In,
    /// Both push and ask.
    #[default]
    Both,
}

impl SyncDirection {
    /// Returns true if a message in this direction carries state the
    /// receiver may merge.
    pub fn pushes_state(&self) -> bool {
        matches!(self, SyncDirection::Out | SyncDirection::Both)
    }

    /// Returns true if a message in this direction asks the receiver to
    /// answer with its own state.
    pub fn requests_state(&self) -> bool {
        matches!(self, SyncDirection::In | SyncDirection::Both)
    }

    /// Returns the wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::Out => "out",
            SyncDirection::In => "in",
            SyncDirection::Both => "both",
        }
    }
}

impl FromStr for SyncDirection {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        match s {
            "out" => Ok(SyncDirection::Out),
            "in" => Ok(SyncDirection::In),
            "both" => Ok(SyncDirection::Both),
            other => Err(ProtocolError::InvalidDirection(other.to_string())),
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_both() {
        assert_eq!(SyncDirection::default(), SyncDirection::Both);
    }

    #[test]
    fn push_and_request_flags() {
        assert!(SyncDirection::Out.pushes_state());
        assert!(!SyncDirection::Out.requests_state());

        assert!(!SyncDirection::In.pushes_state());
        assert!(SyncDirection::In.requests_state());

        assert!(SyncDirection::Both.pushes_state());
        assert!(SyncDirection::Both.requests_state());
    }

    #[test]
    fn tokens_parse() {
        for direction in [SyncDirection::Out, SyncDirection::In, SyncDirection::Both] {
            assert_eq!(direction.as_str().parse::<SyncDirection>().unwrap(), direction);
        }
        assert!(matches!(
            "sideways".parse::<SyncDirection>(),
            Err(ProtocolError::InvalidDirection(_))
        ));
    }
}
