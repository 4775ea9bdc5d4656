//! `sessionStorage` session store.

use super::window;
use crate::error::{js_message, WasmError, WasmResult};
use tabstore_storage::{SessionStore, StorageError, StorageResult};

/// Session store backed by the tab's `window.sessionStorage`.
pub struct WebSessionStore {
    storage: web_sys::Storage,
}

impl WebSessionStore {
    /// Opens the current tab's `sessionStorage`.
    pub fn open() -> WasmResult<Self> {
        let storage = window()?
            .session_storage()?
            .ok_or_else(|| WasmError::NotSupported("sessionStorage unavailable".into()))?;
        Ok(Self { storage })
    }
}

impl SessionStore for WebSessionStore {
    fn get(&self, name: &str) -> StorageResult<Option<String>> {
        self.storage
            .get_item(name)
            .map_err(|e| StorageError::Backend(js_message(&e)))
    }

    fn set(&self, name: &str, value: &str) -> StorageResult<()> {
        self.storage
            .set_item(name, value)
            .map_err(|e| StorageError::Backend(js_message(&e)))
    }
}
