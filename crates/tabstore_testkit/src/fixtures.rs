//! Multi-tab fixtures.

use tabstore_engine::{MemoryBroadcast, MemoryBroadcastHub, SyncConfig, SyncEngine};
use tabstore_protocol::Snapshot;
use tabstore_storage::InMemorySessionStore;

/// A tab backed by in-memory primitives.
pub type MemoryTab = SyncEngine<InMemorySessionStore, MemoryBroadcast>;

/// Several tabs of one origin sharing a [`MemoryBroadcastHub`].
///
/// Tabs are addressed by the index returned when they are opened.
#[derive(Debug, Default)]
pub struct TabCluster {
    hub: MemoryBroadcastHub,
    tabs: Vec<MemoryTab>,
}

impl TabCluster {
    /// Creates a cluster without tabs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cluster of `count` tabs that send no initial sync.
    #[must_use]
    pub fn with_quiet_tabs(count: usize) -> Self {
        let mut cluster = Self::new();
        for _ in 0..count {
            cluster.open_quiet_tab();
        }
        cluster
    }

    /// Opens a tab with an empty session store.
    pub fn open_tab(&mut self, config: SyncConfig) -> usize {
        self.push(config, InMemorySessionStore::new())
    }

    /// Opens a tab with no initial sync and an empty session store.
    pub fn open_quiet_tab(&mut self) -> usize {
        self.open_tab(SyncConfig::new().without_initial_sync())
    }

    /// Opens a tab whose session store already holds `items`, as after a
    /// reload of the tab.
    pub fn open_tab_with(&mut self, config: SyncConfig, items: &Snapshot) -> usize {
        let blob = serde_json::to_string(items).expect("snapshot serializes");
        let store = InMemorySessionStore::with_blobs([(config.store_key.clone(), blob)]);
        self.push(config, store)
    }

    fn push(&mut self, config: SyncConfig, store: InMemorySessionStore) -> usize {
        let tab = SyncEngine::open(config, store, self.hub.endpoint())
            .expect("memory broadcast accepts subscriptions");
        self.tabs.push(tab);
        self.tabs.len() - 1
    }

    /// Returns the tab at `index`.
    ///
    /// # Panics
    ///
    /// Panics if no tab was opened at `index`.
    #[must_use]
    pub fn tab(&self, index: usize) -> &MemoryTab {
        &self.tabs[index]
    }

    /// Returns the number of tabs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Returns true if no tab is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Returns the shared hub.
    #[must_use]
    pub fn hub(&self) -> &MemoryBroadcastHub {
        &self.hub
    }

    /// Delivers every pending notification. Returns how many were delivered.
    pub fn settle(&self) -> usize {
        self.hub.run_until_idle()
    }

    /// Returns every tab's snapshot, in tab order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.tabs.iter().map(|tab| tab.snapshot()).collect()
    }

    /// Returns true if all tabs hold the same mapping.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        let snapshots = self.snapshots();
        snapshots.windows(2).all(|pair| pair[0] == pair[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_opens_tabs() {
        let cluster = TabCluster::with_quiet_tabs(3);
        assert_eq!(cluster.len(), 3);
        assert_eq!(cluster.hub().subscriber_count(), 3);
        assert!(cluster.is_converged());
    }

    #[test]
    fn seeded_tab_holds_items() {
        let mut cluster = TabCluster::new();
        let items = Snapshot::from([("a".to_string(), "1".to_string())]);
        let tab = cluster.open_tab_with(SyncConfig::new().without_initial_sync(), &items);
        assert_eq!(cluster.tab(tab).snapshot(), items);
    }

    #[test]
    fn settle_converges_single_writer() {
        let mut cluster = TabCluster::with_quiet_tabs(2);
        let writer = cluster.open_quiet_tab();

        cluster.tab(writer).set("k", "v");
        assert!(!cluster.is_converged());
        assert!(cluster.settle() > 0);
        assert!(cluster.is_converged());
    }
}
