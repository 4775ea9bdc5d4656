//! Configuration for the sync engine.

use tabstore_protocol::{PeerId, SyncDirection};

/// Default name of the session store blob holding the mapping.
pub const DEFAULT_STORE_KEY: &str = "tabStorage";

/// Default name of the shared broadcast slot.
pub const DEFAULT_CHANNEL: &str = "tabStorage";

/// Configuration for a sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Session store name under which the mapping is kept.
    pub store_key: String,
    /// Broadcast slot shared by all peers.
    pub channel: String,
    /// Sync request sent when the engine opens, if any.
    pub initial_sync: Option<SyncDirection>,
    /// Fixed peer id instead of a generated one.
    pub peer_id: Option<PeerId>,
}

impl SyncConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store_key: DEFAULT_STORE_KEY.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            initial_sync: Some(SyncDirection::Both),
            peer_id: None,
        }
    }

    /// Sets the session store name.
    #[must_use]
    pub fn with_store_key(mut self, store_key: impl Into<String>) -> Self {
        self.store_key = store_key.into();
        self
    }

    /// Sets the broadcast slot name.
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Sets the direction of the sync request sent on open.
    #[must_use]
    pub fn with_initial_sync(mut self, direction: SyncDirection) -> Self {
        self.initial_sync = Some(direction);
        self
    }

    /// Opens without any sync request.
    #[must_use]
    pub fn without_initial_sync(mut self) -> Self {
        self.initial_sync = None;
        self
    }

    /// Pins the peer id.
    ///
    /// Two engines sharing an id both accept sync pushes directed at it.
    #[must_use]
    pub fn with_peer_id(mut self, peer_id: PeerId) -> Self {
        self.peer_id = Some(peer_id);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
