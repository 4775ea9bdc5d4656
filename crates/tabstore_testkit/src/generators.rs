//! Property-based test generators using proptest.

use proptest::prelude::*;
use tabstore_engine::{Broadcast, SyncDirection, SyncEngine};
use tabstore_protocol::Snapshot;
use tabstore_storage::SessionStore;

/// Strategy for store keys.
pub fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

/// Strategy for store values, including quotes, escapes and non-ASCII text.
pub fn value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,12}",
        "\\PC{0,12}",
        Just(String::new()),
        Just(r#"{"nested":"json"}"#.to_string()),
    ]
}

/// Strategy for whole snapshots.
pub fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    prop::collection::btree_map(key_strategy(), value_strategy(), 0..8)
}

/// Strategy for sync directions.
pub fn direction_strategy() -> impl Strategy<Value = SyncDirection> {
    prop_oneof![
        Just(SyncDirection::Out),
        Just(SyncDirection::In),
        Just(SyncDirection::Both),
    ]
}

/// One announced store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// `set(key, value)`.
    Set(String, String),
    /// `remove(key)`.
    Remove(String),
    /// `clear()`.
    Clear,
}

impl StoreOp {
    /// Applies this mutation through `tab`, announcing it.
    pub fn apply<S, B>(&self, tab: &SyncEngine<S, B>)
    where
        S: SessionStore,
        B: Broadcast,
    {
        match self {
            StoreOp::Set(key, value) => tab.set(key, value),
            StoreOp::Remove(key) => tab.remove(key),
            StoreOp::Clear => tab.clear(),
        }
    }

    /// Applies this mutation to a plain map, as the reference model.
    pub fn apply_to(&self, model: &mut Snapshot) {
        match self {
            StoreOp::Set(key, value) => {
                model.insert(key.clone(), value.clone());
            }
            StoreOp::Remove(key) => {
                model.remove(key);
            }
            StoreOp::Clear => model.clear(),
        }
    }
}

/// Strategy for single mutations, weighted towards `set`.
pub fn op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        6 => (key_strategy(), value_strategy()).prop_map(|(k, v)| StoreOp::Set(k, v)),
        3 => key_strategy().prop_map(StoreOp::Remove),
        1 => Just(StoreOp::Clear),
    ]
}

/// Strategy for mutation sequences.
pub fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<StoreOp>> {
    prop::collection::vec(op_strategy(), 0..max_len)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn keys_are_identifiers(key in key_strategy()) {
            let first = key.chars().next();
            prop_assert!(first.map_or(false, |c| c.is_ascii_lowercase()));
        }

        #[test]
        fn snapshots_are_bounded(snapshot in snapshot_strategy()) {
            prop_assert!(snapshot.len() < 8);
        }

        #[test]
        fn model_clear_empties(ops in ops_strategy(8)) {
            let mut model = Snapshot::new();
            for op in &ops {
                op.apply_to(&mut model);
            }
            StoreOp::Clear.apply_to(&mut model);
            prop_assert!(model.is_empty());
        }
    }
}
