//! Subscription manager fanning out snapshots and events.

use crate::types::ToastSnapshot;
use crossbeam_channel::{bounded, Sender};
use parking_lot::{ReentrantMutex, RwLock};
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{
    DropReason, EventConfig, EventHandle, EventFilter, Listener, SubscriptionId, ToastEvent,
};

/// Internal event subscription state.
struct EventSubscription {
    filter: EventFilter,
    sender: Sender<ToastEvent>,
}

impl EventSubscription {
    /// Try to send an event. Returns false if the buffer is full or the
    /// receiver is gone (subscriber will be dropped).
    fn try_send(&self, event: ToastEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(crossbeam_channel::TrySendError::Full(_)) => false,
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Manages snapshot listeners and event channels.
///
/// Listeners are called synchronously on the thread that changed the
/// toasts, never while the toast state is locked, so they may call back into
/// the toast manager. Deliveries are serialized and each listener sees
/// snapshot versions in increasing order; a snapshot older than one already
/// delivered is skipped. A listener must not block on another thread that
/// changes the toasts.
pub struct SubscriptionManager {
    listeners: RwLock<HashMap<SubscriptionId, Listener>>,
    /// Version of the newest snapshot handed to listeners.
    delivered: ReentrantMutex<Cell<u64>>,
    channels: RwLock<HashMap<SubscriptionId, EventSubscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    default_buffer_size: usize,
}

impl SubscriptionManager {
    pub fn new(default_buffer_size: usize) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            delivered: ReentrantMutex::new(Cell::new(0)),
            channels: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            default_buffer_size,
        }
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    // --- Listeners ---

    pub fn add_listener(&self, listener: Listener) -> SubscriptionId {
        let id = self.allocate_id();
        self.listeners.write().insert(id, listener);
        id
    }

    pub fn remove_listener(&self, id: SubscriptionId) {
        self.listeners.write().remove(&id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Hand a snapshot to every listener, unless a newer one was already
    /// delivered.
    pub fn publish(&self, snapshot: &Arc<ToastSnapshot>) {
        let version = snapshot.version();
        let delivered = self.delivered.lock();
        if version <= delivered.get() {
            tracing::trace!(version, delivered = delivered.get(), "skipping stale snapshot");
            return;
        }
        delivered.set(version);

        let listeners: Vec<Listener> = self.listeners.read().values().cloned().collect();
        for listener in listeners {
            // A listener that changed the toasts has delivered a newer one.
            if delivered.get() != version {
                break;
            }
            listener(snapshot);
        }
    }

    /// Version of the newest snapshot delivered to listeners.
    pub fn delivered_version(&self) -> u64 {
        self.delivered.lock().get()
    }

    // --- Event channels ---

    /// Open a bounded event channel.
    pub fn subscribe_events(&self, config: EventConfig) -> EventHandle {
        let id = self.allocate_id();
        let (sender, receiver) = bounded(config.buffer_size.unwrap_or(self.default_buffer_size));

        self.channels.write().insert(
            id,
            EventSubscription {
                filter: config.filter,
                sender,
            },
        );

        EventHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe_events(&self, id: SubscriptionId) {
        let mut channels = self.channels.write();
        if let Some(sub) = channels.remove(&id) {
            // Send dropped event (best effort)
            let _ = sub.sender.try_send(ToastEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Broadcast an event to matching channels. Drops subscribers that fail
    /// to receive.
    pub fn broadcast(&self, event: ToastEvent) {
        let mut to_remove = Vec::new();

        {
            let channels = self.channels.read();
            for (id, sub) in channels.iter() {
                if sub.filter.matches(&event) && !sub.try_send(event.clone()) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut channels = self.channels.write();
            for id in to_remove {
                if let Some(sub) = channels.remove(&id) {
                    tracing::warn!(subscription = id.0, "dropping slow toast event subscriber");
                    let _ = sub.sender.try_send(ToastEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Position;
    use crate::types::{CloseReason, ToastId, ToastKind};
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn snapshot(version: u64) -> Arc<ToastSnapshot> {
        Arc::new(ToastSnapshot {
            version,
            limit: 3,
            position: Position::default(),
            close_button: false,
            records: Arc::from(Vec::new()),
        })
    }

    fn added(id: &str, kind: ToastKind) -> ToastEvent {
        ToastEvent::Added {
            id: ToastId::from(id),
            kind,
        }
    }

    #[test]
    fn test_listener_add_remove() {
        let manager = SubscriptionManager::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let id = manager.add_listener(Arc::new(move |_: &Arc<ToastSnapshot>| {
            counted.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(manager.listener_count(), 1);

        manager.remove_listener(id);
        assert_eq!(manager.listener_count(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_publish_skips_older_snapshot() {
        let manager = SubscriptionManager::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager.add_listener(Arc::new(move |s: &Arc<ToastSnapshot>| {
            sink.lock().push(s.version());
        }));

        manager.publish(&snapshot(2));
        manager.publish(&snapshot(1));
        manager.publish(&snapshot(2));
        manager.publish(&snapshot(3));

        assert_eq!(*seen.lock(), vec![2, 3]);
        assert_eq!(manager.delivered_version(), 3);
    }

    #[test]
    fn test_nested_publish_keeps_listener_order() {
        let manager = Arc::new(SubscriptionManager::default());
        let seen = Arc::new(Mutex::new(Vec::new()));

        // Whichever listener runs first publishes a newer snapshot from inside
        // its callback; nobody may see version 1 after version 2.
        for name in ["a", "b"] {
            let sink = Arc::clone(&seen);
            let weak = Arc::downgrade(&manager);
            manager.add_listener(Arc::new(move |s: &Arc<ToastSnapshot>| {
                sink.lock().push((name, s.version()));
                if s.version() == 1 {
                    if let Some(manager) = weak.upgrade() {
                        manager.publish(&snapshot(2));
                    }
                }
            }));
        }

        manager.publish(&snapshot(1));

        let seen = seen.lock();
        for name in ["a", "b"] {
            let versions: Vec<u64> = seen
                .iter()
                .filter(|(n, _)| *n == name)
                .map(|(_, v)| *v)
                .collect();
            assert!(versions.windows(2).all(|w| w[0] < w[1]), "{:?}", versions);
            assert_eq!(versions.last(), Some(&2));
        }
    }

    #[test]
    fn test_broadcast_to_matching() {
        let manager = SubscriptionManager::default();
        let handle = manager.subscribe_events(EventConfig {
            filter: EventFilter::kinds(vec![ToastKind::Error]),
            ..Default::default()
        });

        manager.broadcast(added("t1", ToastKind::Success));
        manager.broadcast(added("t2", ToastKind::Error));

        let event = handle.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(event, added("t2", ToastKind::Error));
        assert!(handle.try_recv().is_err());
    }

    #[test]
    fn test_closes_filter() {
        let manager = SubscriptionManager::default();
        let handle = manager.subscribe_events(EventConfig {
            filter: EventFilter::closes(),
            ..Default::default()
        });

        manager.broadcast(added("t1", ToastKind::Info));
        manager.broadcast(ToastEvent::Closed {
            id: ToastId::from("t1"),
            kind: ToastKind::Info,
            reason: CloseReason::TimedOut,
        });

        let events = handle.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ToastEvent::Closed { reason: CloseReason::TimedOut, .. }));
    }

    #[test]
    fn test_drop_slow_subscriber() {
        let manager = SubscriptionManager::default();
        let _handle = manager.subscribe_events(EventConfig {
            buffer_size: Some(2),
            filter: EventFilter::all(),
        });

        for i in 0..10 {
            manager.broadcast(added(&format!("t{}", i), ToastKind::Default));
        }

        assert_eq!(manager.channel_count(), 0);
    }

    #[test]
    fn test_unsubscribe_sends_dropped() {
        let manager = SubscriptionManager::default();
        let handle = manager.subscribe_events(EventConfig {
            filter: EventFilter::all(),
            ..Default::default()
        });
        manager.unsubscribe_events(handle.id);

        assert_eq!(
            handle.try_recv().unwrap(),
            ToastEvent::Dropped {
                reason: DropReason::Unsubscribed
            }
        );
        assert_eq!(manager.channel_count(), 0);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(ToastEvent::Closed {
            id: ToastId::from("t3"),
            kind: ToastKind::Warning,
            reason: CloseReason::UserDismissed,
        })
        .unwrap();
        assert_eq!(json["type"], "closed");
        assert_eq!(json["id"], "t3");
        assert_eq!(json["kind"], "warning");
        assert_eq!(json["reason"], "user_dismissed");
    }
}
