//! Web storage primitives.
//!
//! - `sessionStorage` holds the tab's own mapping
//! - `localStorage` is the shared slot written to notify sibling tabs

mod broadcast;
mod session;

pub use broadcast::LocalStorageBroadcast;
pub use session::WebSessionStore;

use crate::error::{WasmError, WasmResult};

fn window() -> WasmResult<web_sys::Window> {
    web_sys::window().ok_or_else(|| WasmError::NotSupported("no window object".into()))
}
