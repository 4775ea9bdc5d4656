//! # tabstore Testkit
//!
//! Test utilities for tabstore.
//!
//! This crate provides:
//! - [`TabCluster`], several tabs sharing one in-memory broadcast hub
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use tabstore_testkit::prelude::*;
//!
//! let mut cluster = TabCluster::new();
//! let a = cluster.open_quiet_tab();
//! let b = cluster.open_quiet_tab();
//!
//! cluster.tab(a).set("x", "1");
//! cluster.settle();
//! assert_eq!(cluster.tab(b).get("x").as_deref(), Some("1"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
