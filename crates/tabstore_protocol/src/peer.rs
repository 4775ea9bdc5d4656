//! Peer identity.

use crate::error::{ProtocolError, ProtocolResult};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identity of one sync engine instance.
///
/// Generated once per engine and immutable afterwards. It is only used to
/// tell a directed sync addressed to this peer apart from one addressed to
/// another peer, so practical distinctness is enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(Uuid);

impl PeerId {
    /// Generates a new random peer id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for PeerId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ProtocolError::InvalidPeerId(s.to_string()))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
