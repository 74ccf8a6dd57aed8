//! Subscription types for toast change notifications.

use crate::types::{CloseReason, ToastId, ToastKind, ToastSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};

use super::manager::SubscriptionManager;

/// Snapshot listener. Called after every change with the full ordered list.
pub type Listener = Arc<dyn Fn(&Arc<ToastSnapshot>) + Send + Sync>;

/// Configuration for an event subscription.
#[derive(Clone, Debug, Default)]
pub struct EventConfig {
    /// Max buffered events before dropping the subscriber.
    /// Default: the toaster's `event_buffer_size`.
    pub buffer_size: Option<usize>,

    /// Filter criteria.
    pub filter: EventFilter,
}

/// Filter criteria for event subscriptions.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// Filter by toast kind (None = all kinds).
    pub kinds: Option<Vec<ToastKind>>,

    pub include_added: bool,
    pub include_updated: bool,
    pub include_closed: bool,
}

impl EventFilter {
    /// Every lifecycle event.
    pub fn all() -> Self {
        Self {
            kinds: None,
            include_added: true,
            include_updated: true,
            include_closed: true,
        }
    }

    /// Every lifecycle event for the given kinds.
    pub fn kinds(kinds: Vec<ToastKind>) -> Self {
        Self {
            kinds: Some(kinds),
            ..Self::all()
        }
    }

    /// Only close events.
    pub fn closes() -> Self {
        Self {
            include_closed: true,
            ..Default::default()
        }
    }

    pub(crate) fn matches(&self, event: &ToastEvent) -> bool {
        let (wanted, kind) = match event {
            ToastEvent::Added { kind, .. } => (self.include_added, kind),
            ToastEvent::Updated { kind, .. } => (self.include_updated, kind),
            ToastEvent::Closed { kind, .. } => (self.include_closed, kind),
            ToastEvent::Dropped { .. } => return true,
        };
        if !wanted {
            return false;
        }
        match self.kinds {
            Some(ref kinds) => kinds.contains(kind),
            None => true,
        }
    }
}

/// Lifecycle events emitted to event subscriptions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToastEvent {
    /// A toast was created.
    Added { id: ToastId, kind: ToastKind },

    /// A toast was updated in place.
    Updated { id: ToastId, kind: ToastKind },

    /// A toast was removed.
    Closed {
        id: ToastId,
        kind: ToastKind,
        reason: CloseReason,
    },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to an event subscription.
pub struct EventHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<ToastEvent>,
}

impl EventHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<ToastEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<ToastEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<ToastEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently buffered.
    pub fn drain(&self) -> Vec<ToastEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Registration of a snapshot listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) manager: Weak<SubscriptionManager>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Stop receiving snapshots.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.remove_listener(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
