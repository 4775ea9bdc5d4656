//! `localStorage` broadcast primitive.
//!
//! Browsers fire `storage` events for `localStorage` changes in every
//! other tab of the origin, never in the tab that made the change, which
//! is exactly the delivery guarantee the sync protocol needs.

use super::window;
use crate::error::{js_message, WasmError, WasmResult};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tabstore_engine::{
    Broadcast, BroadcastListener, ListenerId, Notification, SyncError, SyncResult,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::StorageEvent;

type StorageListener = Closure<dyn FnMut(StorageEvent)>;

/// Broadcast primitive over `window.localStorage` and `storage` events.
pub struct LocalStorageBroadcast {
    window: web_sys::Window,
    storage: web_sys::Storage,
    next_listener: Cell<u64>,
    listeners: RefCell<HashMap<ListenerId, StorageListener>>,
}

impl LocalStorageBroadcast {
    /// Opens the origin's `localStorage`.
    pub fn open() -> WasmResult<Self> {
        let window = window()?;
        let storage = window
            .local_storage()?
            .ok_or_else(|| WasmError::NotSupported("localStorage unavailable".into()))?;
        Ok(Self {
            window,
            storage,
            next_listener: Cell::new(0),
            listeners: RefCell::new(HashMap::new()),
        })
    }

    fn detach(&self, closure: &StorageListener) -> SyncResult<()> {
        self.window
            .remove_event_listener_with_callback("storage", closure.as_ref().unchecked_ref())
            .map_err(|e| SyncError::broadcast(js_message(&e)))
    }
}

impl Broadcast for LocalStorageBroadcast {
    fn write(&self, name: &str, value: &str) -> SyncResult<()> {
        self.storage
            .set_item(name, value)
            .map_err(|e| SyncError::broadcast(js_message(&e)))
    }

    fn clear(&self, name: &str) -> SyncResult<()> {
        self.storage
            .remove_item(name)
            .map_err(|e| SyncError::broadcast(js_message(&e)))
    }

    fn subscribe(&self, listener: Rc<dyn BroadcastListener>) -> SyncResult<ListenerId> {
        let area = self.storage.clone();
        let closure = StorageListener::new(move |event: StorageEvent| {
            // Same-origin frames of this tab report sessionStorage writes too.
            if event.storage_area().as_ref() != Some(&area) {
                return;
            }
            // `localStorage.clear()` fires without a key.
            let Some(name) = event.key() else {
                return;
            };
            listener.on_notification(&Notification {
                name,
                new_value: event.new_value(),
            });
        });

        self.window
            .add_event_listener_with_callback("storage", closure.as_ref().unchecked_ref())
            .map_err(|e| SyncError::broadcast(js_message(&e)))?;

        let id = ListenerId::new(self.next_listener.get());
        self.next_listener.set(id.value() + 1);
        self.listeners.borrow_mut().insert(id, closure);
        Ok(id)
    }

    fn unsubscribe(&self, id: ListenerId) -> SyncResult<()> {
        let closure = self.listeners.borrow_mut().remove(&id);
        match closure {
            Some(closure) => self.detach(&closure),
            None => Ok(()),
        }
    }
}

impl Drop for LocalStorageBroadcast {
    fn drop(&mut self) {
        for (_, closure) in self.listeners.take() {
            let _ = self.detach(&closure);
        }
    }
}
