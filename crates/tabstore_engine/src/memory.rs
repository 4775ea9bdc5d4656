//! In-process broadcast medium.
//!
//! Models the browser's storage-change event: a write on one endpoint is
//! queued for every listener of every *other* endpoint and handed out
//! when the hub is pumped, the way the host event loop delivers events
//! after the writing task returns. A listener that broadcasts while
//! handling a notification only adds to the queue.

use crate::error::SyncResult;
use crate::transport::{Broadcast, BroadcastListener, ListenerId, Notification};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use tracing::{trace, warn};

/// Upper bound on deliveries per [`MemoryBroadcastHub::run_until_idle`] call.
const MAX_DELIVERIES: usize = 100_000;

struct Subscriber {
    endpoint: u64,
    listener: Rc<dyn BroadcastListener>,
}

struct Delivery {
    listener: ListenerId,
    notification: Notification,
}

#[derive(Default)]
struct HubState {
    next_endpoint: u64,
    next_listener: u64,
    subscribers: BTreeMap<ListenerId, Subscriber>,
    queue: VecDeque<Delivery>,
    slots: HashMap<String, String>,
    delivered: u64,
}

impl HubState {
    fn enqueue(&mut self, sender: u64, notification: Notification) {
        let targets: Vec<ListenerId> = self
            .subscribers
            .iter()
            .filter(|(_, subscriber)| subscriber.endpoint != sender)
            .map(|(id, _)| *id)
            .collect();

        for listener in targets {
            self.queue.push_back(Delivery {
                listener,
                notification: notification.clone(),
            });
        }
    }
}

/// A shared broadcast medium connecting any number of endpoints (tabs).
///
/// # Example
///
/// ```rust
/// use tabstore_engine::{MemoryBroadcastHub, SyncConfig, SyncEngine};
/// use tabstore_storage::InMemorySessionStore;
///
/// let hub = MemoryBroadcastHub::new();
/// let a = SyncEngine::open(SyncConfig::new(), InMemorySessionStore::new(), hub.endpoint()).unwrap();
/// let b = SyncEngine::open(SyncConfig::new(), InMemorySessionStore::new(), hub.endpoint()).unwrap();
///
/// a.set("x", "1");
/// hub.run_until_idle();
/// assert_eq!(b.get("x").as_deref(), Some("1"));
/// ```
#[derive(Clone, Default)]
pub struct MemoryBroadcastHub {
    state: Rc<RefCell<HubState>>,
}

impl MemoryBroadcastHub {
    /// Creates a hub with no endpoints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new endpoint, one per simulated tab.
    pub fn endpoint(&self) -> MemoryBroadcast {
        let mut state = self.state.borrow_mut();
        let endpoint = state.next_endpoint;
        state.next_endpoint += 1;
        MemoryBroadcast {
            endpoint,
            hub: self.clone(),
        }
    }

    /// Returns the number of queued notifications.
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Returns the number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }

    /// Returns the total number of notifications delivered so far.
    pub fn delivered(&self) -> u64 {
        self.state.borrow().delivered
    }

    /// Returns the current content of slot `name`.
    ///
    /// Slots written through the sync protocol are cleared right after
    /// each write, so this is normally `None`.
    pub fn slot(&self, name: &str) -> Option<String> {
        self.state.borrow().slots.get(name).cloned()
    }

    /// Delivers the oldest queued notification. Returns false if the queue
    /// was empty.
    pub fn deliver_next(&self) -> bool {
        let next = {
            let mut state = self.state.borrow_mut();
            loop {
                let Some(delivery) = state.queue.pop_front() else {
                    break None;
                };
                // Listeners that unsubscribed after the write miss it.
                if let Some(subscriber) = state.subscribers.get(&delivery.listener) {
                    let listener = Rc::clone(&subscriber.listener);
                    state.delivered += 1;
                    break Some((listener, delivery));
                }
            }
        };

        match next {
            Some((listener, delivery)) => {
                trace!(listener = %delivery.listener, slot = %delivery.notification.name, "delivering notification");
                listener.on_notification(&delivery.notification);
                true
            }
            None => false,
        }
    }

    /// Delivers queued notifications, including ones queued while
    /// delivering, until the queue is empty. Returns how many were
    /// delivered.
    pub fn run_until_idle(&self) -> usize {
        let mut count = 0;
        while self.deliver_next() {
            count += 1;
            if count >= MAX_DELIVERIES {
                warn!(pending = self.pending(), "broadcast hub did not settle");
                break;
            }
        }
        count
    }
}

impl std::fmt::Debug for MemoryBroadcastHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryBroadcastHub")
            .field("subscribers", &state.subscribers.len())
            .field("pending", &state.queue.len())
            .field("delivered", &state.delivered)
            .finish()
    }
}

/// One tab's view of a [`MemoryBroadcastHub`].
#[derive(Clone, Debug)]
pub struct MemoryBroadcast {
    endpoint: u64,
    hub: MemoryBroadcastHub,
}

impl MemoryBroadcast {
    /// Returns the hub this endpoint belongs to.
    pub fn hub(&self) -> &MemoryBroadcastHub {
        &self.hub
    }
}

impl Broadcast for MemoryBroadcast {
    fn write(&self, name: &str, value: &str) -> SyncResult<()> {
        let mut state = self.hub.state.borrow_mut();
        state.slots.insert(name.to_string(), value.to_string());
        state.enqueue(self.endpoint, Notification::written(name, value));
        Ok(())
    }

    fn clear(&self, name: &str) -> SyncResult<()> {
        let mut state = self.hub.state.borrow_mut();
        state.slots.remove(name);
        state.enqueue(self.endpoint, Notification::cleared(name));
        Ok(())
    }

    fn subscribe(&self, listener: Rc<dyn BroadcastListener>) -> SyncResult<ListenerId> {
        let mut state = self.hub.state.borrow_mut();
        let id = ListenerId::new(state.next_listener);
        state.next_listener += 1;
        state.subscribers.insert(
            id,
            Subscriber {
                endpoint: self.endpoint,
                listener,
            },
        );
        Ok(id)
    }

    fn unsubscribe(&self, id: ListenerId) -> SyncResult<()> {
        let mut state = self.hub.state.borrow_mut();
        state.subscribers.remove(&id);
        state.queue.retain(|delivery| delivery.listener != id);
        Ok(())
    }
}
