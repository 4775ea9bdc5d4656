//! Broadcast primitive abstraction.

use crate::error::SyncResult;
use std::fmt;
use std::rc::Rc;

/// One storage-change notification as seen by a receiving peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Slot that changed.
    pub name: String,
    /// Value written, or `None` when the slot was cleared.
    pub new_value: Option<String>,
}

impl Notification {
    /// Creates a notification for a write.
    pub fn written(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            new_value: Some(value.into()),
        }
    }

    /// Creates a notification for a clear.
    pub fn cleared(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            new_value: None,
        }
    }
}

/// Handle identifying one subscription on a broadcast primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Creates a listener id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Receiver of broadcast notifications.
pub trait BroadcastListener {
    /// Handles one notification.
    fn on_notification(&self, notification: &Notification);
}

/// A cross-tab notification channel.
///
/// Writing or clearing a slot notifies every *other* subscribed peer with
/// the slot name and its new value. Implementations must never deliver a
/// notification to listeners subscribed through the endpoint that wrote
/// it; the sync protocol relies on this to avoid re-applying its own
/// announcements.
///
/// Listeners are shared through `Rc`: one engine lives on one tab's event
/// loop and is never moved across threads.
pub trait Broadcast {
    /// Writes `value` into slot `name`.
    fn write(&self, name: &str, value: &str) -> SyncResult<()>;

    /// Clears slot `name`.
    fn clear(&self, name: &str) -> SyncResult<()>;

    /// Starts delivering peers' notifications to `listener`.
    fn subscribe(&self, listener: Rc<dyn BroadcastListener>) -> SyncResult<ListenerId>;

    /// Stops delivering to the listener registered as `id`.
    ///
    /// Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId) -> SyncResult<()>;
}

impl<B: Broadcast + ?Sized> Broadcast for Rc<B> {
    fn write(&self, name: &str, value: &str) -> SyncResult<()> {
        (**self).write(name, value)
    }

    fn clear(&self, name: &str) -> SyncResult<()> {
        (**self).clear(name)
    }

    fn subscribe(&self, listener: Rc<dyn BroadcastListener>) -> SyncResult<ListenerId> {
        (**self).subscribe(listener)
    }

    fn unsubscribe(&self, id: ListenerId) -> SyncResult<()> {
        (**self).unsubscribe(id)
    }
}
