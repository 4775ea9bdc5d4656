//! Sync engine: outbound announcements and the inbound protocol state machine.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::local_store::LocalStore;
use crate::transport::{Broadcast, BroadcastListener, ListenerId, Notification};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tabstore_protocol::{Envelope, PeerId, Snapshot, SyncDirection};
use tabstore_storage::SessionStore;
use tracing::{debug, trace, warn};

/// Counters describing one engine's traffic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Envelopes broadcast by this engine.
    pub messages_sent: u64,
    /// Notifications on the channel carrying a payload.
    pub messages_received: u64,
    /// Inbound envelopes that changed (or were merged into) the local store.
    pub messages_applied: u64,
    /// Notifications for other slots, or without payload.
    pub messages_ignored: u64,
    /// Payloads that were malformed or of an unrecognized type.
    pub messages_dropped: u64,
    /// Sync snapshots merged into the local store.
    pub snapshots_merged: u64,
    /// Sync replies sent in answer to `in`/`both` requests.
    pub echoes_sent: u64,
}

struct EngineInner<S: SessionStore, B: Broadcast> {
    config: SyncConfig,
    peer_id: PeerId,
    local: LocalStore<S>,
    broadcast: B,
    stats: RefCell<SyncStats>,
}

impl<S: SessionStore, B: Broadcast> EngineInner<S, B> {
    /// Encodes and broadcasts one envelope as a write followed by a clear.
    fn emit(&self, envelope: &Envelope) {
        if let Err(e) = self.try_emit(envelope) {
            warn!(
                peer = %self.peer_id,
                message = %envelope.message_type(),
                error = %e,
                "failed to broadcast envelope"
            );
        }
    }

    fn try_emit(&self, envelope: &Envelope) -> SyncResult<()> {
        let payload = envelope.encode()?;
        trace!(peer = %self.peer_id, message = %envelope.message_type(), "broadcasting");
        self.broadcast.write(&self.config.channel, &payload)?;
        self.broadcast.clear(&self.config.channel)?;
        self.stats.borrow_mut().messages_sent += 1;
        Ok(())
    }

    /// Sends a sync request; only `out` pushes name this peer as origin.
    fn request_sync(&self, direction: SyncDirection) {
        let origin = (direction == SyncDirection::Out).then_some(self.peer_id);
        self.emit(&Envelope::sync(direction, self.local.snapshot(), origin));
    }

    fn handle_notification(&self, notification: &Notification) {
        if notification.name != self.config.channel {
            self.stats.borrow_mut().messages_ignored += 1;
            return;
        }
        debug!(peer = %self.peer_id, "received notification");

        // The clear that follows every write arrives without a payload.
        let Some(payload) = notification.new_value.as_deref().filter(|v| !v.is_empty()) else {
            self.stats.borrow_mut().messages_ignored += 1;
            return;
        };
        self.stats.borrow_mut().messages_received += 1;

        match Envelope::decode(payload) {
            Ok(envelope) => self.dispatch(envelope),
            Err(e) if e.is_unrecognized() => {
                debug!(peer = %self.peer_id, error = %e, "envelope unhandled");
                self.stats.borrow_mut().messages_dropped += 1;
            }
            Err(e) => {
                debug!(peer = %self.peer_id, error = %e, "dropping malformed envelope");
                self.stats.borrow_mut().messages_dropped += 1;
            }
        }
    }

    fn dispatch(&self, envelope: Envelope) {
        let result = match envelope {
            Envelope::Clear => {
                debug!("clear()");
                self.local.clear()
            }
            Envelope::RemoveItem { key } => {
                debug!("removeItem('{key}')");
                self.local.remove(&key)
            }
            Envelope::SetItem { key, value } => {
                debug!("setItem('{key}', '{value}')");
                self.local.set(&key, &value)
            }
            Envelope::Sync {
                direction,
                snapshot,
                origin,
            } => {
                self.apply_sync(direction, snapshot, origin);
                return;
            }
        };

        match result {
            Ok(()) => self.stats.borrow_mut().messages_applied += 1,
            Err(e) => warn!(peer = %self.peer_id, error = %e, "failed to apply envelope"),
        }
    }

    fn apply_sync(&self, direction: SyncDirection, snapshot: Snapshot, origin: Option<PeerId>) {
        debug!(peer = %self.peer_id, %direction, origin = ?origin, keys = snapshot.len(), "sync");

        if self.accepts(direction, origin) {
            match self.local.merge(snapshot) {
                Ok(()) => {
                    let mut stats = self.stats.borrow_mut();
                    stats.messages_applied += 1;
                    stats.snapshots_merged += 1;
                }
                Err(e) => warn!(peer = %self.peer_id, error = %e, "failed to merge snapshot"),
            }
        }

        if direction.requests_state() {
            // The reply keeps the request's origin so directed replies stay directed.
            self.emit(&Envelope::sync(
                SyncDirection::Out,
                self.local.snapshot(),
                origin,
            ));
            self.stats.borrow_mut().echoes_sent += 1;
        }
    }

    /// Undirected pushes apply everywhere; directed pushes only at the
    /// addressed peer.
    fn accepts(&self, direction: SyncDirection, origin: Option<PeerId>) -> bool {
        // `both` also asks for state back, so its origin never restricts it.
        direction.pushes_state()
            && (direction.requests_state() || origin.map_or(true, |id| id == self.peer_id))
    }
}

impl<S: SessionStore, B: Broadcast> BroadcastListener for EngineInner<S, B> {
    fn on_notification(&self, notification: &Notification) {
        self.handle_notification(notification);
    }
}

/// A tab's session store, kept consistent with its sibling tabs.
///
/// The engine subscribes to the broadcast primitive in [`SyncEngine::open`]
/// and unsubscribes in [`SyncEngine::close`] or when dropped. All store
/// operations are synchronous and never fail towards the caller; store or
/// broadcast failures are logged and cost at most one missed
/// synchronization.
///
/// # Example
///
/// ```rust
/// use tabstore_engine::{MemoryBroadcastHub, SyncConfig, SyncEngine};
/// use tabstore_storage::InMemorySessionStore;
///
/// let hub = MemoryBroadcastHub::new();
/// let tab = SyncEngine::open(SyncConfig::new(), InMemorySessionStore::new(), hub.endpoint()).unwrap();
///
/// tab.set("theme", "dark");
/// assert_eq!(tab.get("theme").as_deref(), Some("dark"));
/// assert_eq!(tab.keys(), vec!["theme".to_string()]);
/// ```
pub struct SyncEngine<S: SessionStore, B: Broadcast> {
    inner: Rc<EngineInner<S, B>>,
    listener: Cell<Option<ListenerId>>,
}

impl<S: SessionStore + 'static, B: Broadcast + 'static> SyncEngine<S, B> {
    /// Opens the local store, subscribes to `broadcast`, and sends the
    /// configured initial sync request.
    ///
    /// # Errors
    ///
    /// Returns an error if the broadcast primitive refuses the subscription.
    pub fn open(config: SyncConfig, store: S, broadcast: B) -> SyncResult<Self> {
        let peer_id = config.peer_id.unwrap_or_else(PeerId::generate);
        let local = LocalStore::open(store, config.store_key.clone());
        let inner = Rc::new(EngineInner {
            config,
            peer_id,
            local,
            broadcast,
            stats: RefCell::new(SyncStats::default()),
        });

        let listener: Rc<dyn BroadcastListener> = Rc::clone(&inner) as Rc<dyn BroadcastListener>;
        let id = inner.broadcast.subscribe(listener)?;
        debug!(peer = %peer_id, channel = %inner.config.channel, %id, "sync engine opened");

        let engine = Self {
            inner,
            listener: Cell::new(Some(id)),
        };
        if let Some(direction) = engine.inner.config.initial_sync {
            engine.inner.request_sync(direction);
        }
        Ok(engine)
    }
}

impl<S: SessionStore, B: Broadcast> SyncEngine<S, B> {
    /// Returns this engine's peer id.
    pub fn peer_id(&self) -> PeerId {
        self.inner.peer_id
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Returns traffic counters.
    pub fn stats(&self) -> SyncStats {
        self.inner.stats.borrow().clone()
    }

    /// Returns the underlying session store.
    pub fn session_store(&self) -> &S {
        self.inner.local.session_store()
    }

    /// Returns true while the engine receives peers' notifications.
    pub fn is_subscribed(&self) -> bool {
        self.listener.get().is_some()
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.local.get(key)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.local.contains_key(key)
    }

    /// Returns all keys in enumeration order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.local.keys()
    }

    /// Returns the `n`-th key in enumeration order.
    pub fn key(&self, n: usize) -> Option<String> {
        self.inner.local.key(n)
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.inner.local.len()
    }

    /// Returns true if no key is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.local.is_empty()
    }

    /// Returns a copy of the whole mapping.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.local.snapshot()
    }

    /// Sets `key` to `value` and announces it.
    pub fn set(&self, key: &str, value: &str) {
        self.announce(self.inner.local.set(key, value), || {
            Envelope::set_item(key, value)
        });
    }

    /// Removes `key` and announces it.
    pub fn remove(&self, key: &str) {
        self.announce(self.inner.local.remove(key), || Envelope::remove_item(key));
    }

    /// Removes every key and announces it.
    pub fn clear(&self) {
        self.announce(self.inner.local.clear(), || Envelope::Clear);
    }

    /// Merges `items` into the store (incoming wins per key) and pushes the
    /// resulting snapshot to every peer.
    pub fn set_items(&self, items: Snapshot) {
        self.announce(self.inner.local.merge(items), || {
            Envelope::sync(SyncDirection::Out, self.inner.local.snapshot(), None)
        });
    }

    /// Sends a sync request in `direction`, the same one `open` sends.
    pub fn request_sync(&self, direction: SyncDirection) {
        self.inner.request_sync(direction);
    }

    /// Feeds one notification to the inbound state machine.
    ///
    /// Broadcast implementations call this through [`BroadcastListener`];
    /// hosts that receive storage events on their own can call it directly.
    pub fn handle_notification(&self, notification: &Notification) {
        self.inner.handle_notification(notification);
    }

    /// Unsubscribes and drops the engine. The local store is left intact.
    pub fn close(self) {
        self.release();
    }

    fn announce(&self, applied: SyncResult<()>, envelope: impl FnOnce() -> Envelope) {
        match applied {
            Ok(()) => self.inner.emit(&envelope()),
            Err(e) => warn!(
                peer = %self.inner.peer_id,
                error = %e,
                "local store update failed, not announcing"
            ),
        }
    }

    fn release(&self) {
        if let Some(id) = self.listener.take() {
            if let Err(e) = self.inner.broadcast.unsubscribe(id) {
                warn!(peer = %self.inner.peer_id, %id, error = %e, "failed to unsubscribe");
            }
            debug!(peer = %self.inner.peer_id, %id, "sync engine closed");
        }
    }
}

impl<S: SessionStore, B: Broadcast> Drop for SyncEngine<S, B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<S: SessionStore, B: Broadcast> std::fmt::Debug for SyncEngine<S, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("peer_id", &self.inner.peer_id)
            .field("channel", &self.inner.config.channel)
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBroadcast, MemoryBroadcastHub};
    use tabstore_storage::InMemorySessionStore;

    type Tab = SyncEngine<InMemorySessionStore, MemoryBroadcast>;

    fn quiet() -> SyncConfig {
        SyncConfig::new().without_initial_sync()
    }

    fn open(hub: &MemoryBroadcastHub, config: SyncConfig) -> Tab {
        SyncEngine::open(config, InMemorySessionStore::new(), hub.endpoint()).unwrap()
    }

    fn open_with(hub: &MemoryBroadcastHub, config: SyncConfig, pairs: &[(&str, &str)]) -> Tab {
        let tab = open(hub, config);
        for (key, value) in pairs {
            tab.inner.local.set(key, value).unwrap();
        }
        tab
    }

    fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Delivers `envelope` to `tab` as if a peer had broadcast it.
    fn inject(tab: &Tab, envelope: &Envelope) {
        tab.handle_notification(&Notification::written(
            tab.config().channel.clone(),
            envelope.encode().unwrap(),
        ));
    }

    #[test]
    fn set_reaches_peer_and_keeps_its_keys() {
        let hub = MemoryBroadcastHub::new();
        let a = open(&hub, quiet());
        let b = open_with(&hub, quiet(), &[("y", "2")]);

        a.set("x", "1");
        hub.run_until_idle();

        assert_eq!(b.snapshot(), snapshot(&[("x", "1"), ("y", "2")]));
        assert_eq!(b.stats().messages_applied, 1);
    }

    #[test]
    fn remove_and_clear_replicate() {
        let hub = MemoryBroadcastHub::new();
        let a = open(&hub, quiet());
        let b = open(&hub, quiet());

        a.set("x", "1");
        a.set("y", "2");
        a.remove("x");
        hub.run_until_idle();
        assert_eq!(b.snapshot(), snapshot(&[("y", "2")]));

        b.clear();
        hub.run_until_idle();
        assert!(a.is_empty());
    }

    #[test]
    fn own_broadcasts_are_not_reapplied() {
        let hub = MemoryBroadcastHub::new();
        let a = open(&hub, quiet());

        a.set("x", "1");
        hub.run_until_idle();

        let stats = a.stats();
        assert_eq!(stats.messages_sent, 1);
        assert_eq!(stats.messages_received, 0);
        assert_eq!(stats.messages_applied, 0);
    }

    #[test]
    fn inbound_changes_are_not_reannounced() {
        let hub = MemoryBroadcastHub::new();
        let a = open(&hub, quiet());
        let b = open(&hub, quiet());

        a.set("x", "1");
        hub.run_until_idle();

        assert_eq!(b.stats().messages_sent, 0);
        assert_eq!(hub.pending(), 0);
    }

    #[test]
    fn directed_push_only_applies_at_addressed_peer() {
        let hub = MemoryBroadcastHub::new();
        let id_a = PeerId::generate();
        let b = open(&hub, quiet());
        let c = open(&hub, quiet().with_peer_id(id_a));

        let push = Envelope::sync(SyncDirection::Out, snapshot(&[("k", "v")]), Some(id_a));
        inject(&b, &push);
        inject(&c, &push);

        assert!(b.is_empty());
        assert_eq!(c.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn undirected_push_applies_everywhere() {
        let hub = MemoryBroadcastHub::new();
        let b = open_with(&hub, quiet(), &[("a", "1"), ("b", "2")]);

        inject(
            &b,
            &Envelope::sync(SyncDirection::Out, snapshot(&[("a", "9")]), None),
        );

        assert_eq!(b.snapshot(), snapshot(&[("a", "9"), ("b", "2")]));
        assert_eq!(b.stats().snapshots_merged, 1);
        assert_eq!(b.stats().echoes_sent, 0);
    }

    #[test]
    fn in_request_is_answered_but_not_applied() {
        let hub = MemoryBroadcastHub::new();
        let b = open_with(&hub, quiet(), &[("a", "1")]);

        inject(
            &b,
            &Envelope::sync(SyncDirection::In, snapshot(&[("z", "26")]), None),
        );

        assert_eq!(b.snapshot(), snapshot(&[("a", "1")]));
        assert_eq!(b.stats().echoes_sent, 1);
        assert_eq!(b.stats().messages_sent, 1);
    }

    #[test]
    fn echo_preserves_origin() {
        let hub = MemoryBroadcastHub::new();
        let requester = PeerId::generate();
        let b = open_with(&hub, quiet(), &[("a", "1")]);
        let addressed = open(&hub, quiet().with_peer_id(requester));
        let bystander = open(&hub, quiet());

        inject(
            &b,
            &Envelope::sync(SyncDirection::In, Snapshot::new(), Some(requester)),
        );
        hub.run_until_idle();

        assert_eq!(addressed.get("a").as_deref(), Some("1"));
        assert!(bystander.is_empty());
    }

    #[test]
    fn bidirectional_bootstrap() {
        let hub = MemoryBroadcastHub::new();
        let y = open_with(&hub, quiet(), &[("a", "1")]);
        let x = open(&hub, SyncConfig::new());

        hub.run_until_idle();

        assert_eq!(x.snapshot(), snapshot(&[("a", "1")]));
        assert_eq!(y.snapshot(), snapshot(&[("a", "1")]));
        assert_eq!(y.stats().echoes_sent, 1);
    }

    #[test]
    fn initial_out_push_is_addressed_to_self() {
        let hub = MemoryBroadcastHub::new();
        let peer = open(&hub, quiet());
        let _x = open_with(
            &hub,
            quiet().with_initial_sync(SyncDirection::Out),
            &[],
        );
        // The push was sent before any key existed; only a peer sharing the
        // sender's id would merge it, and nobody replies to `out`.
        hub.run_until_idle();
        assert_eq!(peer.stats().messages_received, 1);
        assert_eq!(peer.stats().snapshots_merged, 0);
        assert_eq!(peer.stats().messages_sent, 0);
    }

    #[test]
    fn set_items_merges_and_pushes() {
        let hub = MemoryBroadcastHub::new();
        let a = open_with(&hub, quiet(), &[("a", "1")]);
        let b = open_with(&hub, quiet(), &[("b", "2")]);

        a.set_items(snapshot(&[("c", "3")]));
        hub.run_until_idle();

        assert_eq!(a.snapshot(), snapshot(&[("a", "1"), ("c", "3")]));
        assert_eq!(b.snapshot(), snapshot(&[("a", "1"), ("b", "2"), ("c", "3")]));
    }

    #[test]
    fn empty_and_foreign_notifications_ignored() {
        let hub = MemoryBroadcastHub::new();
        let b = open_with(&hub, quiet(), &[("a", "1")]);

        b.handle_notification(&Notification::cleared("tabStorage"));
        b.handle_notification(&Notification::written("tabStorage", ""));
        b.handle_notification(&Notification::written(
            "somethingElse",
            Envelope::Clear.encode().unwrap(),
        ));

        assert_eq!(b.get("a").as_deref(), Some("1"));
        assert_eq!(b.stats().messages_ignored, 3);
        assert_eq!(b.stats().messages_received, 0);
    }

    #[test]
    fn malformed_and_unknown_envelopes_dropped() {
        let hub = MemoryBroadcastHub::new();
        let b = open_with(&hub, quiet(), &[("a", "1")]);

        b.handle_notification(&Notification::written("tabStorage", "{oops"));
        b.handle_notification(&Notification::written("tabStorage", r#"{"key":"a"}"#));
        b.handle_notification(&Notification::written(
            "tabStorage",
            r#"{"message":"rename","key":"a"}"#,
        ));

        assert_eq!(b.get("a").as_deref(), Some("1"));
        assert_eq!(b.stats().messages_received, 3);
        assert_eq!(b.stats().messages_dropped, 3);
    }

    #[test]
    fn legacy_payloads_are_understood() {
        let hub = MemoryBroadcastHub::new();
        let b = open_with(&hub, quiet(), &[("a", "1")]);

        b.handle_notification(&Notification::written(
            "tabStorage",
            r#"{"message":"sync","key":"out","value":"{\"a\":\"2\"}"}"#,
        ));

        assert_eq!(b.get("a").as_deref(), Some("2"));
    }

    #[test]
    fn failed_local_write_is_not_announced() {
        let hub = MemoryBroadcastHub::new();
        let a = open(&hub, quiet());
        let b = open(&hub, quiet());

        a.session_store().set_writable(false);
        a.set("x", "1");
        hub.run_until_idle();

        assert_eq!(a.get("x"), None);
        assert_eq!(a.stats().messages_sent, 0);
        assert!(b.is_empty());
    }

    #[test]
    fn drop_unsubscribes() {
        let hub = MemoryBroadcastHub::new();
        let a = open(&hub, quiet());
        let b = open(&hub, quiet());
        assert_eq!(hub.subscriber_count(), 2);

        drop(b);
        assert_eq!(hub.subscriber_count(), 1);

        a.set("x", "1");
        assert_eq!(hub.pending(), 0);
    }

    #[test]
    fn close_unsubscribes_and_keeps_store() {
        let hub = MemoryBroadcastHub::new();
        let store = std::sync::Arc::new(InMemorySessionStore::new());
        let tab = SyncEngine::open(quiet(), std::sync::Arc::clone(&store), hub.endpoint()).unwrap();
        assert!(tab.is_subscribed());

        tab.set("x", "1");
        tab.close();

        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(store.get("tabStorage").unwrap().as_deref(), Some(r#"{"x":"1"}"#));
    }

    #[test]
    fn emissions_clear_the_slot() {
        let hub = MemoryBroadcastHub::new();
        let a = open(&hub, quiet());
        let _b = open(&hub, quiet());

        a.set("x", "1");
        assert_eq!(hub.slot("tabStorage"), None);
        // One write notification, one clear notification.
        assert_eq!(hub.pending(), 2);
    }
}
