//! # tabstore Sync Engine
//!
//! Keeps a tab-private, session-scoped key-value store consistent with the
//! equivalent stores of sibling tabs.
//!
//! This crate provides:
//! - [`LocalStore`], the JSON-blob mapping kept in a [`SessionStore`]
//! - [`Broadcast`], the cross-tab notification contract
//! - [`SyncEngine`], which announces local mutations and re-applies peers'
//! - [`MemoryBroadcastHub`], an in-process broadcast medium for native hosts
//!   and tests
//!
//! ## Architecture
//!
//! Every local mutation is applied to the local store first and then
//! announced as one [`Envelope`] on a shared broadcast channel. Peers
//! re-apply announced mutations quietly, so nothing is announced twice.
//! A `sync` envelope exchanges whole snapshots in a chosen
//! [`SyncDirection`].
//!
//! ## Key Invariants
//!
//! - A broadcast is never delivered back to its sender
//! - Inbound envelopes are applied without re-announcing them
//! - Snapshots merge per key, incoming value wins, local-only keys survive
//! - Store operations never fail towards the caller
//!
//! [`SessionStore`]: tabstore_storage::SessionStore
//! [`Envelope`]: tabstore_protocol::Envelope
//! [`SyncDirection`]: tabstore_protocol::SyncDirection

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod local_store;
mod memory;
mod transport;

pub use config::{SyncConfig, DEFAULT_CHANNEL, DEFAULT_STORE_KEY};
pub use engine::{SyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use local_store::LocalStore;
pub use memory::{MemoryBroadcast, MemoryBroadcastHub};
pub use transport::{Broadcast, BroadcastListener, ListenerId, Notification};

pub use tabstore_protocol::{Envelope, PeerId, Snapshot, SyncDirection};
