//! In-memory session store.

use crate::backend::SessionStore;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory session store.
///
/// This store keeps all blobs in memory and is suitable for:
/// - Unit tests
/// - Simulating several tabs inside one process
/// - Native hosts that embed the sync engine
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use tabstore_storage::{SessionStore, InMemorySessionStore};
///
/// let store = InMemorySessionStore::new();
/// assert_eq!(store.get("missing").unwrap(), None);
/// store.set("name", "value").unwrap();
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug)]
pub struct InMemorySessionStore {
    blobs: RwLock<HashMap<String, String>>,
    writable: AtomicBool,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            writable: AtomicBool::new(true),
        }
    }
}

impl InMemorySessionStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing blobs.
    ///
    /// Useful for testing recovery from a corrupt blob.
    #[must_use]
    pub fn with_blobs<I, K, V>(blobs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            blobs: RwLock::new(
                blobs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            writable: AtomicBool::new(true),
        }
    }

    /// Makes subsequent writes succeed or fail with [`StorageError::ReadOnly`].
    pub fn set_writable(&self, writable: bool) {
        self.writable.store(writable, Ordering::SeqCst);
    }

    /// Returns the number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns true if no blob is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, name: &str) -> StorageResult<Option<String>> {
        Ok(self.blobs.read().get(name).cloned())
    }

    fn set(&self, name: &str, value: &str) -> StorageResult<()> {
        if !self.writable.load(Ordering::SeqCst) {
            return Err(StorageError::ReadOnly);
        }
        self.blobs.write().insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemorySessionStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("tabStorage").unwrap(), None);
    }

    #[test]
    fn memory_set_then_get() {
        let store = InMemorySessionStore::new();
        store.set("tabStorage", r#"{"a":"1"}"#).unwrap();
        assert_eq!(
            store.get("tabStorage").unwrap().as_deref(),
            Some(r#"{"a":"1"}"#)
        );
    }

    #[test]
    fn memory_set_overwrites() {
        let store = InMemorySessionStore::new();
        store.set("slot", "first").unwrap();
        store.set("slot", "second").unwrap();
        assert_eq!(store.get("slot").unwrap().as_deref(), Some("second"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_with_blobs() {
        let store = InMemorySessionStore::with_blobs([("tabStorage", "not json")]);
        assert_eq!(store.get("tabStorage").unwrap().as_deref(), Some("not json"));
    }

    #[test]
    fn memory_read_only_rejects_writes() {
        let store = InMemorySessionStore::new();
        store.set("slot", "kept").unwrap();
        store.set_writable(false);

        let result = store.set("slot", "lost");
        assert_eq!(result, Err(StorageError::ReadOnly));
        assert_eq!(store.get("slot").unwrap().as_deref(), Some("kept"));

        store.set_writable(true);
        store.set("slot", "written").unwrap();
        assert_eq!(store.get("slot").unwrap().as_deref(), Some("written"));
    }

    #[test]
    fn shared_store_through_arc() {
        let store = Arc::new(InMemorySessionStore::new());
        let handle = Arc::clone(&store);
        handle.set("slot", "via arc").unwrap();
        assert_eq!(store.get("slot").unwrap().as_deref(), Some("via arc"));
    }
}
