//! # tabstore Storage
//!
//! Session store trait and implementations for tabstore.
//!
//! This crate provides the lowest-level storage abstraction for tabstore.
//! A session store is an **opaque string store** scoped to one tab: it maps
//! names to string blobs and does not interpret what it holds.
//!
//! ## Design Principles
//!
//! - Stores are simple name → string maps (get, set)
//! - No knowledge of the JSON layout tabstore writes into them
//! - Scoped to a single tab and never shared across tabs
//! - tabstore owns all blob interpretation
//!
//! ## Available Stores
//!
//! - [`InMemorySessionStore`] - For native hosts, tests and simulations
//!
//! Browser builds provide a `sessionStorage`-backed store in `tabstore_wasm`.
//!
//! ## Example
//!
//! ```rust
//! use tabstore_storage::{SessionStore, InMemorySessionStore};
//!
//! let store = InMemorySessionStore::new();
//! store.set("tabStorage", "{}").unwrap();
//! assert_eq!(store.get("tabStorage").unwrap().as_deref(), Some("{}"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;

pub use backend::SessionStore;
pub use error::{StorageError, StorageResult};
pub use memory::InMemorySessionStore;
