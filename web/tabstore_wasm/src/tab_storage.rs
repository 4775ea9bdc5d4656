//! JavaScript-facing tab storage.

use crate::backend::{LocalStorageBroadcast, WebSessionStore};
use crate::error::WasmError;
use js_sys::Array;
use tabstore_engine::{SyncConfig, SyncEngine};
use tabstore_protocol::{Snapshot, SyncDirection};
use wasm_bindgen::prelude::*;

/// A tab-private store kept in sync with every other tab of the origin.
///
/// ## Example
///
/// ```javascript
/// const storage = new TabStorage();
/// storage.setItem('draft', 'hello');
/// storage.getItem('draft'); // 'hello', in this and every sibling tab
/// storage.close();
/// ```
#[wasm_bindgen]
pub struct TabStorage {
    engine: SyncEngine<WebSessionStore, LocalStorageBroadcast>,
}

#[wasm_bindgen]
impl TabStorage {
    /// Opens the tab's store.
    ///
    /// # Arguments
    ///
    /// * `sync` - Whether to send a sync request now (default `true`)
    /// * `direction` - `'out'`, `'in'` or `'both'` (default `'both'`)
    #[wasm_bindgen(constructor)]
    pub fn new(sync: Option<bool>, direction: Option<String>) -> Result<TabStorage, JsValue> {
        let direction = match direction {
            Some(token) => parse_direction(&token)?,
            None => SyncDirection::Both,
        };
        let config = if sync.unwrap_or(true) {
            SyncConfig::new().with_initial_sync(direction)
        } else {
            SyncConfig::new().without_initial_sync()
        };

        let engine = SyncEngine::open(
            config,
            WebSessionStore::open()?,
            LocalStorageBroadcast::open()?,
        )
        .map_err(WasmError::from)?;
        Ok(TabStorage { engine })
    }

    /// This tab's peer id.
    #[wasm_bindgen(getter)]
    pub fn guid(&self) -> String {
        self.engine.peer_id().to_string()
    }

    /// Number of stored keys.
    #[wasm_bindgen(getter)]
    pub fn length(&self) -> usize {
        self.engine.len()
    }

    /// Returns the value for `key`, or `undefined`.
    #[wasm_bindgen(js_name = getItem)]
    pub fn get_item(&self, key: &str) -> Option<String> {
        self.engine.get(key)
    }

    /// Sets `key` in this tab and every sibling tab.
    #[wasm_bindgen(js_name = setItem)]
    pub fn set_item(&self, key: &str, value: &str) {
        self.engine.set(key, value);
    }

    /// Removes `key` in this tab and every sibling tab.
    #[wasm_bindgen(js_name = removeItem)]
    pub fn remove_item(&self, key: &str) {
        self.engine.remove(key);
    }

    /// Removes every key in this tab and every sibling tab.
    pub fn clear(&self) {
        self.engine.clear();
    }

    /// Merges a JSON string or a plain object of strings into the store and
    /// pushes the result to sibling tabs.
    #[wasm_bindgen(js_name = setItems)]
    pub fn set_items(&self, items: JsValue) -> Result<(), JsValue> {
        let items: Snapshot = match items.as_string() {
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| WasmError::InvalidInput(e.to_string()))?,
            None => serde_wasm_bindgen::from_value(items)
                .map_err(|e| WasmError::InvalidInput(e.to_string()))?,
        };
        self.engine.set_items(items);
        Ok(())
    }

    /// All keys in enumeration order.
    pub fn keys(&self) -> Array {
        self.engine
            .keys()
            .into_iter()
            .map(|key| JsValue::from_str(&key))
            .collect()
    }

    /// The `n`-th key, or `null`.
    pub fn key(&self, n: usize) -> JsValue {
        self.engine
            .key(n)
            .map_or(JsValue::NULL, |key| JsValue::from_str(&key))
    }

    /// Sends a sync request in `direction`.
    #[wasm_bindgen(js_name = requestSync)]
    pub fn request_sync(&self, direction: &str) -> Result<(), JsValue> {
        self.engine.request_sync(parse_direction(direction)?);
        Ok(())
    }

    /// Stops listening to sibling tabs. The stored data stays in
    /// `sessionStorage`.
    pub fn close(self) {
        self.engine.close();
    }
}

fn parse_direction(token: &str) -> Result<SyncDirection, WasmError> {
    token
        .parse()
        .map_err(|e: tabstore_protocol::ProtocolError| WasmError::InvalidInput(e.to_string()))
}
