//! Session store trait definition.

use crate::error::StorageResult;

/// A tab-scoped string store.
///
/// Session stores are **opaque string stores**. They hold one string per
/// name for the lifetime of a tab and are never visible to other tabs.
/// tabstore keeps its whole key-value mapping as one JSON blob under a
/// single name.
///
/// # Invariants
///
/// - `get` returns exactly the string most recently passed to `set` for
///   that name, or `None` if nothing was ever set
/// - Contents live as long as the tab; durability beyond that is not required
///
/// # Implementors
///
/// - [`super::InMemorySessionStore`] - For native hosts and tests
pub trait SessionStore {
    /// Reads the blob stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be accessed.
    fn get(&self, name: &str) -> StorageResult<Option<String>>;

    /// Replaces the blob stored under `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The store is read-only or unavailable
    /// - The host refuses the write (quota)
    fn set(&self, name: &str, value: &str) -> StorageResult<()>;
}

impl<S: SessionStore + ?Sized> SessionStore for &S {
    fn get(&self, name: &str) -> StorageResult<Option<String>> {
        (**self).get(name)
    }

    fn set(&self, name: &str, value: &str) -> StorageResult<()> {
        (**self).set(name, value)
    }
}

impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    fn get(&self, name: &str) -> StorageResult<Option<String>> {
        (**self).get(name)
    }

    fn set(&self, name: &str, value: &str) -> StorageResult<()> {
        (**self).set(name, value)
    }
}
