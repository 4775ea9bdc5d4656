//! # tabstore Sync Protocol
//!
//! Cross-tab sync protocol types and JSON codec for tabstore.
//!
//! This crate provides:
//! - [`Envelope`], the typed message carried by one broadcast notification
//! - [`SyncDirection`] for directional resynchronization
//! - [`PeerId`] for directed-message targeting
//! - JSON encoding/decoding of the wire format
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod direction;
mod envelope;
mod error;
mod peer;

pub use direction::SyncDirection;
pub use envelope::{parse_snapshot, Envelope, MessageType, Snapshot};
pub use error::{ProtocolError, ProtocolResult};
pub use peer::PeerId;
