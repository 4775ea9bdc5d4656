//! The tab-local key-value mapping.

use crate::error::SyncResult;
use tabstore_protocol::Snapshot;
use tabstore_storage::SessionStore;
use tracing::{debug, warn};

/// A string → string mapping stored as one JSON object blob in a
/// [`SessionStore`].
///
/// Every operation reads the blob, and mutations write it back, so other
/// code in the same tab touching the blob is observed. Mutations here are
/// quiet: nothing is announced to peers. [`crate::SyncEngine`] wraps them
/// with announcements.
///
/// A blob that is not a JSON object reads as an empty mapping and is
/// replaced by the next mutation. Non-string values in an otherwise valid
/// object are kept as their JSON text.
pub struct LocalStore<S: SessionStore> {
    store: S,
    name: String,
}

impl<S: SessionStore> LocalStore<S> {
    /// Opens the mapping stored under `name`, writing an empty one if
    /// none exists yet.
    pub fn open(store: S, name: impl Into<String>) -> Self {
        let local = Self {
            store,
            name: name.into(),
        };
        match local.store.get(&local.name) {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Err(e) = local.write(&Snapshot::new()) {
                    warn!(store = %local.name, error = %e, "failed to initialize local store");
                }
            }
            Err(e) => warn!(store = %local.name, error = %e, "failed to read local store"),
        }
        local
    }

    /// Returns the session store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the underlying session store.
    pub fn session_store(&self) -> &S {
        &self.store
    }

    /// Returns a copy of the whole mapping.
    pub fn snapshot(&self) -> Snapshot {
        self.read().unwrap_or_else(|e| {
            warn!(store = %self.name, error = %e, "failed to read local store");
            Snapshot::new()
        })
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.snapshot().remove(key)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.snapshot().contains_key(key)
    }

    /// Returns all keys in enumeration order.
    pub fn keys(&self) -> Vec<String> {
        self.snapshot().into_keys().collect()
    }

    /// Returns the `n`-th key in enumeration order.
    pub fn key(&self, n: usize) -> Option<String> {
        self.snapshot().into_keys().nth(n)
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns true if no key is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sets `key` to `value`.
    pub fn set(&self, key: &str, value: &str) -> SyncResult<()> {
        let mut items = self.read()?;
        items.insert(key.to_string(), value.to_string());
        self.write(&items)
    }

    /// Removes `key`; absent keys are not an error.
    pub fn remove(&self, key: &str) -> SyncResult<()> {
        let mut items = self.read()?;
        items.remove(key);
        self.write(&items)
    }

    /// Removes every key.
    pub fn clear(&self) -> SyncResult<()> {
        self.write(&Snapshot::new())
    }

    /// Merges `incoming` into the mapping. Incoming values win per key;
    /// keys absent from `incoming` are kept.
    pub fn merge(&self, incoming: Snapshot) -> SyncResult<()> {
        let mut items = self.read()?;
        items.extend(incoming);
        self.write(&items)
    }

    fn read(&self) -> SyncResult<Snapshot> {
        let Some(blob) = self.store.get(&self.name)? else {
            return Ok(Snapshot::new());
        };
        match tabstore_protocol::parse_snapshot(&blob) {
            Ok(items) => Ok(items),
            Err(e) => {
                debug!(store = %self.name, error = %e, "local store is corrupt, reading as empty");
                Ok(Snapshot::new())
            }
        }
    }

    fn write(&self, items: &Snapshot) -> SyncResult<()> {
        let blob = serde_json::to_string(items).map_err(tabstore_protocol::ProtocolError::from)?;
        self.store.set(&self.name, &blob)?;
        Ok(())
    }
}

impl<S: SessionStore> std::fmt::Debug for LocalStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabstore_storage::InMemorySessionStore;

    fn open_empty() -> LocalStore<InMemorySessionStore> {
        LocalStore::open(InMemorySessionStore::new(), "tabStorage")
    }

    #[test]
    fn open_initializes_empty_blob() {
        let local = open_empty();
        assert_eq!(
            local.session_store().get("tabStorage").unwrap().as_deref(),
            Some("{}")
        );
        assert!(local.is_empty());
    }

    #[test]
    fn open_keeps_existing_blob() {
        let store = InMemorySessionStore::with_blobs([("tabStorage", r#"{"a":"1"}"#)]);
        let local = LocalStore::open(store, "tabStorage");
        assert_eq!(local.get("a").as_deref(), Some("1"));
    }

    #[test]
    fn set_then_get() {
        let local = open_empty();
        local.set("theme", "dark").unwrap();
        assert_eq!(local.get("theme").as_deref(), Some("dark"));
        assert!(local.contains_key("theme"));
        assert_eq!(local.get("missing"), None);
    }

    #[test]
    fn remove_and_clear() {
        let local = open_empty();
        local.set("a", "1").unwrap();
        local.set("b", "2").unwrap();

        local.remove("a").unwrap();
        local.remove("never-set").unwrap();
        assert_eq!(local.keys(), vec!["b".to_string()]);

        local.clear().unwrap();
        local.clear().unwrap();
        assert!(local.is_empty());
    }

    #[test]
    fn keys_and_index() {
        let local = open_empty();
        local.set("b", "2").unwrap();
        local.set("a", "1").unwrap();

        assert_eq!(local.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(local.key(0).as_deref(), Some("a"));
        assert_eq!(local.key(1).as_deref(), Some("b"));
        assert_eq!(local.key(2), None);
        assert_eq!(local.len(), 2);
    }

    #[test]
    fn merge_keeps_local_only_keys() {
        let local = open_empty();
        local.set("a", "1").unwrap();
        local.set("b", "2").unwrap();

        local
            .merge(Snapshot::from([("a".to_string(), "9".to_string())]))
            .unwrap();

        assert_eq!(local.get("a").as_deref(), Some("9"));
        assert_eq!(local.get("b").as_deref(), Some("2"));
    }

    #[test]
    fn corrupt_blob_reads_empty_and_is_replaced() {
        let store = InMemorySessionStore::with_blobs([("tabStorage", "{not json")]);
        let local = LocalStore::open(store, "tabStorage");

        assert!(local.is_empty());
        assert_eq!(local.get("a"), None);

        local.set("a", "1").unwrap();
        assert_eq!(
            local.session_store().get("tabStorage").unwrap().as_deref(),
            Some(r#"{"a":"1"}"#)
        );
    }

    #[test]
    fn non_string_values_survive_next_write() {
        let store = InMemorySessionStore::with_blobs([("tabStorage", r#"{"a":"1","n":5}"#)]);
        let local = LocalStore::open(store, "tabStorage");
        assert_eq!(local.len(), 2);
        assert_eq!(local.get("n").as_deref(), Some("5"));

        local.set("b", "2").unwrap();
        assert_eq!(local.keys(), vec!["a", "b", "n"]);
        assert_eq!(local.get("a").as_deref(), Some("1"));
    }

    #[test]
    fn write_failure_is_reported_and_state_kept() {
        let local = open_empty();
        local.set("a", "1").unwrap();
        local.session_store().set_writable(false);

        assert!(local.set("a", "2").is_err());
        assert_eq!(local.get("a").as_deref(), Some("1"));
    }
}
