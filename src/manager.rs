//! The toast manager: owner of the active toast list and its timers.

use crate::config::ToasterConfig;
use crate::error::Result;
use crate::record;
use crate::scheduler::{Scheduler, TimerToken};
use crate::subscriptions::{
    EventConfig, EventHandle, Subscription, SubscriptionId, SubscriptionManager, ToastEvent,
};
use crate::types::{
    CloseReason, Renderable, Timestamp, ToastId, ToastKind, ToastOptions, ToastPhase, ToastRecord,
    ToastSnapshot,
};
use lru::LruCache;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

/// Auto-dismiss timer of one toast.
enum TimerSlot {
    Armed {
        token: TimerToken,
        /// Distinguishes this arming from earlier ones for the same id.
        generation: u64,
        deadline: Timestamp,
    },
    Paused {
        remaining: Duration,
    },
}

struct State {
    /// Newest first. Includes records whose close callbacks are running.
    records: Vec<ToastRecord>,
    timers: HashMap<ToastId, TimerSlot>,
    paused: bool,
    next_id: u64,
    next_generation: u64,
    version: u64,
    /// Last published snapshot.
    snapshot: Arc<ToastSnapshot>,
    /// Recently closed toasts.
    history: LruCache<ToastId, ToastRecord>,
}

impl State {
    fn active_index(&self, id: &ToastId) -> Option<usize> {
        self.records
            .iter()
            .position(|r| &r.id == id && r.phase == ToastPhase::Active)
    }

    fn generate_id(&mut self) -> ToastId {
        loop {
            let id = ToastId(format!("t{}", self.next_id));
            self.next_id += 1;
            if !self.records.iter().any(|r| r.id == id) {
                return id;
            }
        }
    }
}

struct Inner {
    config: ToasterConfig,
    scheduler: Arc<dyn Scheduler>,
    subscriptions: Arc<SubscriptionManager>,
    state: Mutex<State>,
}

/// Owner of the active toasts.
///
/// Cheap to clone; clones share the same toasts. Every operation is
/// infallible: closing an unknown id is a no-op and updating one creates it.
/// Subscribers and close callbacks run after the internal lock is released,
/// so they may call back into the manager.
///
/// # Example
///
/// ```ignore
/// let clock = Arc::new(ManualScheduler::new());
/// let toasts = ToastManager::new(ToasterConfig::default(), clock.clone())?;
///
/// let id = toasts.loading("Uploading", ToastOptions::new());
/// toasts.update(&id, ToastOptions::new().kind(ToastKind::Success).title("Uploaded"));
///
/// clock.advance(Duration::from_secs(5));
/// assert!(toasts.is_empty());
/// ```
#[derive(Clone)]
pub struct ToastManager {
    inner: Arc<Inner>,
}

impl ToastManager {
    /// Create a manager with a validated config.
    pub fn new(config: ToasterConfig, scheduler: Arc<dyn Scheduler>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, scheduler))
    }

    /// Create a manager with the default config.
    pub fn with_scheduler(scheduler: Arc<dyn Scheduler>) -> Self {
        Self::build(ToasterConfig::default(), scheduler)
    }

    fn build(config: ToasterConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        let history_limit = NonZeroUsize::new(config.history_limit).unwrap_or(NonZeroUsize::MIN);
        let snapshot = Arc::new(ToastSnapshot {
            version: 0,
            limit: config.limit,
            position: config.position,
            close_button: config.close_button,
            records: Arc::from(Vec::new()),
        });

        Self {
            inner: Arc::new(Inner {
                subscriptions: Arc::new(SubscriptionManager::new(config.event_buffer_size)),
                state: Mutex::new(State {
                    records: Vec::new(),
                    timers: HashMap::new(),
                    paused: false,
                    next_id: 1,
                    next_generation: 1,
                    version: 0,
                    snapshot,
                    history: LruCache::new(history_limit),
                }),
                config,
                scheduler,
            }),
        }
    }

    pub fn config(&self) -> &ToasterConfig {
        &self.inner.config
    }

    // --- Show ---

    /// Show a toast. Kind defaults to `Default` unless `options` sets one.
    pub fn show(&self, title: impl Into<Renderable>, mut options: ToastOptions) -> ToastId {
        options.kind.get_or_insert(ToastKind::Default);
        options.title = Some(title.into());
        self.submit(options)
    }

    /// Alias of [`show`](Self::show).
    pub fn message(&self, title: impl Into<Renderable>, options: ToastOptions) -> ToastId {
        self.show(title, options)
    }

    pub fn success(&self, title: impl Into<Renderable>, options: ToastOptions) -> ToastId {
        self.show_kind(ToastKind::Success, title.into(), options)
    }

    pub fn error(&self, title: impl Into<Renderable>, options: ToastOptions) -> ToastId {
        self.show_kind(ToastKind::Error, title.into(), options)
    }

    pub fn warning(&self, title: impl Into<Renderable>, options: ToastOptions) -> ToastId {
        self.show_kind(ToastKind::Warning, title.into(), options)
    }

    pub fn info(&self, title: impl Into<Renderable>, options: ToastOptions) -> ToastId {
        self.show_kind(ToastKind::Info, title.into(), options)
    }

    /// Show a loading toast. It never times out unless `options` sets a
    /// duration; resolve it with [`update`](Self::update) or close it.
    pub fn loading(&self, title: impl Into<Renderable>, options: ToastOptions) -> ToastId {
        self.show_kind(ToastKind::Loading, title.into(), options)
    }

    /// Show a toast whose content is drawn entirely by the renderer.
    ///
    /// Only `id`, `duration`, `dismissible` and the callbacks of `options`
    /// are used. Timers, the visible limit and dismissibility apply as for
    /// any other toast.
    pub fn custom<R: Any + Send + Sync>(&self, render: R, mut options: ToastOptions) -> ToastId {
        options.kind = Some(ToastKind::Default);
        options.title = None;
        options.description = None;
        options.custom = Some(Renderable::node(render));
        self.submit(options)
    }

    fn show_kind(&self, kind: ToastKind, title: Renderable, mut options: ToastOptions) -> ToastId {
        options.kind = Some(kind);
        options.title = Some(title);
        self.submit(options)
    }

    /// Update the toast `id` in place, or create it if it isn't active.
    pub fn update(&self, id: impl Into<ToastId>, mut patch: ToastOptions) -> ToastId {
        patch.id = Some(id.into());
        self.submit(patch)
    }

    /// Insert or update depending on `options.id`.
    pub(crate) fn submit(&self, mut options: ToastOptions) -> ToastId {
        let supplied = options.id.take();
        let now = self.inner.scheduler.now();

        let (id, event, snapshot) = {
            let mut state = self.inner.state.lock();
            let (id, event) = match supplied {
                Some(id) => match state.active_index(&id) {
                    Some(idx) => {
                        let existing = &mut state.records[idx];
                        record::apply(existing, options, self.inner.config.duration, now);
                        let (kind, timeout) = (existing.kind, existing.timeout);
                        tracing::debug!(id = %id, kind = ?kind, timeout = ?timeout, "toast updated");
                        self.arm(&mut state, &id, timeout, now);
                        (id.clone(), ToastEvent::Updated { id, kind })
                    }
                    None => self.insert(&mut state, id, options, true, now),
                },
                None => {
                    let id = state.generate_id();
                    self.insert(&mut state, id, options, false, now)
                }
            };
            let snapshot = self.refresh_snapshot(&mut state);
            (id, event, snapshot)
        };

        self.publish(&snapshot, event);
        id
    }

    fn insert(
        &self,
        state: &mut State,
        id: ToastId,
        options: ToastOptions,
        id_supplied: bool,
        now: Timestamp,
    ) -> (ToastId, ToastEvent) {
        let record = record::build(id.clone(), options, id_supplied, self.inner.config.duration, now);
        let (kind, timeout) = (record.kind, record.timeout);
        state.records.insert(0, record);
        tracing::debug!(id = %id, kind = ?kind, timeout = ?timeout, "toast added");
        self.arm(state, &id, timeout, now);
        (id.clone(), ToastEvent::Added { id, kind })
    }

    // --- Close ---

    /// Close a toast from application code. Works regardless of
    /// `dismissible`. Returns false if `id` was not active.
    pub fn close(&self, id: &ToastId) -> bool {
        self.close_with(id, CloseReason::Dismissed, None)
    }

    /// Alias of [`close`](Self::close).
    pub fn dismiss(&self, id: &ToastId) -> bool {
        self.close(id)
    }

    /// Close a toast because of a click or swipe gesture. Refused for
    /// toasts created with `dismissible(false)`.
    pub fn user_dismiss(&self, id: &ToastId) -> bool {
        self.close_with(id, CloseReason::UserDismissed, None)
    }

    /// Close every active toast. Returns how many were closed.
    pub fn dismiss_all(&self) -> usize {
        let ids: Vec<ToastId> = {
            let state = self.inner.state.lock();
            state
                .records
                .iter()
                .filter(|r| r.phase == ToastPhase::Active)
                .map(|r| r.id.clone())
                .collect()
        };
        ids.iter().filter(|id| self.close(id)).count()
    }

    fn expire(&self, id: &ToastId, generation: u64) {
        self.close_with(id, CloseReason::TimedOut, Some(generation));
    }

    fn close_with(&self, id: &ToastId, reason: CloseReason, generation: Option<u64>) -> bool {
        let (record, callback) = {
            let mut state = self.inner.state.lock();
            let Some(idx) = state.active_index(id) else {
                tracing::trace!(id = %id, reason = ?reason, "close ignored, toast not active");
                return false;
            };

            if let Some(generation) = generation {
                match state.timers.get(id) {
                    Some(TimerSlot::Armed { generation: current, .. }) if *current == generation => {}
                    _ => return false,
                }
            }

            if reason == CloseReason::UserDismissed && !state.records[idx].dismissible {
                tracing::debug!(id = %id, "refused to dismiss non-dismissible toast");
                return false;
            }

            self.disarm(&mut state, id);
            let record = &mut state.records[idx];
            record.phase = ToastPhase::Closing;
            let callback = match reason {
                CloseReason::TimedOut => record.on_auto_close.clone(),
                CloseReason::Dismissed | CloseReason::UserDismissed => record.on_dismiss.clone(),
            };
            (record.clone(), callback)
        };

        if let Some(callback) = callback {
            callback(&record);
        }

        let snapshot = {
            let mut state = self.inner.state.lock();
            let closing = state
                .records
                .iter()
                .position(|r| &r.id == id && r.phase == ToastPhase::Closing);
            if let Some(idx) = closing {
                let removed = state.records.remove(idx);
                state.history.put(removed.id.clone(), removed);
            }
            self.refresh_snapshot(&mut state)
        };

        tracing::debug!(id = %id, reason = ?reason, "toast closed");
        self.publish(
            &snapshot,
            ToastEvent::Closed {
                id: id.clone(),
                kind: record.kind,
                reason,
            },
        );
        true
    }

    // --- Timers ---

    /// Replace the timer of `id` with one for `timeout`.
    fn arm(&self, state: &mut State, id: &ToastId, timeout: Option<Duration>, now: Timestamp) {
        self.disarm(state, id);
        let Some(delay) = timeout else {
            return;
        };
        if state.paused {
            state
                .timers
                .insert(id.clone(), TimerSlot::Paused { remaining: delay });
            return;
        }
        self.schedule_expiry(state, id.clone(), delay, now);
    }

    fn disarm(&self, state: &mut State, id: &ToastId) {
        if let Some(TimerSlot::Armed { token, .. }) = state.timers.remove(id) {
            self.inner.scheduler.cancel(token);
        }
    }

    fn schedule_expiry(&self, state: &mut State, id: ToastId, delay: Duration, now: Timestamp) {
        let generation = state.next_generation;
        state.next_generation += 1;

        let weak = Arc::downgrade(&self.inner);
        let task_id = id.clone();
        let token = self.inner.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    ToastManager { inner }.expire(&task_id, generation);
                }
            }),
        );

        state.timers.insert(
            id,
            TimerSlot::Armed {
                token,
                generation,
                deadline: now.after(delay),
            },
        );
    }

    /// Freeze every auto-dismiss timer, keeping the remaining time. Hosts
    /// call this while the pointer is over the viewport or the window is
    /// hidden. Toasts added while paused start their timers on resume.
    pub fn pause_timers(&self) {
        let mut state = self.inner.state.lock();
        if state.paused {
            return;
        }
        state.paused = true;
        let now = self.inner.scheduler.now();
        for slot in state.timers.values_mut() {
            if let TimerSlot::Armed {
                token, deadline, ..
            } = *slot
            {
                self.inner.scheduler.cancel(token);
                *slot = TimerSlot::Paused {
                    remaining: deadline.saturating_since(now),
                };
            }
        }
        tracing::trace!(timers = state.timers.len(), "toast timers paused");
    }

    /// Restart timers frozen by [`pause_timers`](Self::pause_timers).
    pub fn resume_timers(&self) {
        let mut state = self.inner.state.lock();
        if !state.paused {
            return;
        }
        state.paused = false;
        let now = self.inner.scheduler.now();
        let paused: Vec<(ToastId, Duration)> = state
            .timers
            .iter()
            .filter_map(|(id, slot)| match slot {
                TimerSlot::Paused { remaining } => Some((id.clone(), *remaining)),
                TimerSlot::Armed { .. } => None,
            })
            .collect();
        for (id, remaining) in paused {
            self.schedule_expiry(&mut state, id, remaining, now);
        }
        tracing::trace!(timers = state.timers.len(), "toast timers resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().paused
    }

    /// Time left before `id` auto-dismisses. `None` if it never will or is
    /// not active.
    pub fn remaining(&self, id: &ToastId) -> Option<Duration> {
        let state = self.inner.state.lock();
        match state.timers.get(id)? {
            TimerSlot::Armed { deadline, .. } => {
                Some(deadline.saturating_since(self.inner.scheduler.now()))
            }
            TimerSlot::Paused { remaining } => Some(*remaining),
        }
    }

    // --- Subscriptions ---

    /// Call `listener` with the full ordered list after every change.
    /// Dropping the returned [`Subscription`] unsubscribes.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<ToastSnapshot>) + Send + Sync + 'static,
    {
        let id = self.inner.subscriptions.add_listener(Arc::new(listener));
        Subscription {
            id,
            manager: Arc::downgrade(&self.inner.subscriptions),
        }
    }

    /// Open a bounded channel of lifecycle events.
    pub fn subscribe_events(&self, config: EventConfig) -> EventHandle {
        self.inner.subscriptions.subscribe_events(config)
    }

    pub fn unsubscribe_events(&self, id: SubscriptionId) {
        self.inner.subscriptions.unsubscribe_events(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriptions.listener_count() + self.inner.subscriptions.channel_count()
    }

    fn refresh_snapshot(&self, state: &mut State) -> Arc<ToastSnapshot> {
        state.version += 1;
        let records: Arc<[ToastRecord]> = state
            .records
            .iter()
            .filter(|r| r.phase == ToastPhase::Active)
            .cloned()
            .collect();
        let snapshot = Arc::new(ToastSnapshot {
            version: state.version,
            limit: self.inner.config.limit,
            position: self.inner.config.position,
            close_button: self.inner.config.close_button,
            records,
        });
        state.snapshot = Arc::clone(&snapshot);
        snapshot
    }

    fn publish(&self, snapshot: &Arc<ToastSnapshot>, event: ToastEvent) {
        self.inner.subscriptions.publish(snapshot);
        self.inner.subscriptions.broadcast(event);
    }

    // --- Queries ---

    /// The current snapshot. Unchanged (same `Arc`) until the next change.
    pub fn snapshot(&self) -> Arc<ToastSnapshot> {
        Arc::clone(&self.inner.state.lock().snapshot)
    }

    pub fn get(&self, id: &ToastId) -> Option<ToastRecord> {
        let state = self.inner.state.lock();
        state.active_index(id).map(|idx| state.records[idx].clone())
    }

    pub fn contains(&self, id: &ToastId) -> bool {
        self.inner.state.lock().active_index(id).is_some()
    }

    /// Number of active toasts, visible or queued.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recently closed toasts, most recently closed first.
    pub fn history(&self) -> Vec<ToastRecord> {
        let state = self.inner.state.lock();
        state.history.iter().map(|(_, record)| record.clone()).collect()
    }
}

impl fmt::Debug for ToastManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ToastManager")
            .field("config", &self.inner.config)
            .field("active", &state.records.len())
            .field("timers", &state.timers.len())
            .field("paused", &state.paused)
            .finish()
    }
}
