//! # tabstore WASM
//!
//! WebAssembly bindings for tabstore over the browser's web storage.
//!
//! This crate provides:
//! - A `sessionStorage` session store, private to each tab
//! - A `localStorage` broadcast primitive driven by `storage` events,
//!   which browsers fire in every tab of the origin except the writer
//! - The JavaScript-facing [`TabStorage`] class
//!
//! ## Usage
//!
//! ```javascript
//! import init, { TabStorage } from 'tabstore_wasm';
//!
//! async function main() {
//!     await init();
//!
//!     // Ask sibling tabs for their state and push ours.
//!     const storage = new TabStorage(true, 'both');
//!     storage.setItem('theme', 'dark');
//!
//!     console.log(storage.getItem('theme'), storage.length, storage.keys());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod tab_storage;
mod utils;

pub use backend::{LocalStorageBroadcast, WebSessionStore};
pub use error::*;
pub use tab_storage::*;

use wasm_bindgen::prelude::*;

/// Initialize the WASM module.
///
/// This sets up panic hooks for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    utils::set_panic_hook();
}
