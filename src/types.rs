//! Core types for the toast manager.

use crate::config::Position;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Unique identifier for a toast.
///
/// Unique among the currently active toasts of one manager. Callers may pick
/// their own ids to update a toast in place; otherwise the manager generates
/// `t1`, `t2`, ...
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToastId(pub String);

impl ToastId {
    pub fn new(id: impl Into<String>) -> Self {
        ToastId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ToastId({})", self.0)
    }
}

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ToastId {
    fn from(id: &str) -> Self {
        ToastId(id.to_string())
    }
}

impl From<String> for ToastId {
    fn from(id: String) -> Self {
        ToastId(id)
    }
}

impl From<&ToastId> for ToastId {
    fn from(id: &ToastId) -> Self {
        id.clone()
    }
}

/// Milliseconds on the scheduler's clock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// The timestamp `delay` after this one.
    pub fn after(self, delay: Duration) -> Self {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(millis))
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms)", self.0)
    }
}

/// Kind of toast. Picks the renderer's default icon and styling, and the
/// default timeout policy (`Loading` never auto-dismisses).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    #[default]
    Default,
    Success,
    Error,
    Warning,
    Info,
    Loading,
}

/// Requested auto-dismiss duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastDuration {
    /// Dismiss after this long. Zero means never.
    Finite(Duration),
    /// Never auto-dismiss.
    Infinite,
}

impl ToastDuration {
    pub fn millis(ms: u64) -> Self {
        ToastDuration::Finite(Duration::from_millis(ms))
    }
}

impl From<Duration> for ToastDuration {
    fn from(d: Duration) -> Self {
        ToastDuration::Finite(d)
    }
}

/// Content handed through to the renderer untouched.
#[derive(Clone)]
pub enum Renderable {
    Text(String),
    /// Anything the renderer knows how to draw (a widget, a render closure).
    Node(Arc<dyn Any + Send + Sync>),
}

impl Renderable {
    pub fn node<T: Any + Send + Sync>(value: T) -> Self {
        Renderable::Node(Arc::new(value))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Renderable::Text(s) => Some(s),
            Renderable::Node(_) => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Renderable::Text(_) => None,
            Renderable::Node(node) => node.downcast_ref::<T>(),
        }
    }
}

impl PartialEq for Renderable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Renderable::Text(a), Renderable::Text(b)) => a == b,
            (Renderable::Node(a), Renderable::Node(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Renderable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Renderable::Text(s) => write!(f, "Text({:?})", s),
            Renderable::Node(_) => write!(f, "Node(..)"),
        }
    }
}

impl From<&str> for Renderable {
    fn from(s: &str) -> Self {
        Renderable::Text(s.to_string())
    }
}

impl From<String> for Renderable {
    fn from(s: String) -> Self {
        Renderable::Text(s)
    }
}

/// Lifecycle callback, invoked with the record being closed.
pub type Callback = Arc<dyn Fn(&ToastRecord) + Send + Sync>;

/// A labelled button forwarded to the renderer. The manager never activates it.
#[derive(Clone)]
pub struct ToastAction {
    pub label: String,
    on_activate: Arc<dyn Fn() + Send + Sync>,
}

impl ToastAction {
    pub fn new(label: impl Into<String>, on_activate: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            on_activate: Arc::new(on_activate),
        }
    }

    /// Run the handler (called by the renderer on click).
    pub fn activate(&self) {
        (self.on_activate)()
    }
}

impl fmt::Debug for ToastAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToastAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Where a record is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastPhase {
    Active,
    /// Close callbacks are running; removal follows.
    Closing,
}

/// Why a toast was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Closed by application code.
    Dismissed,
    /// Closed by a click or swipe gesture.
    UserDismissed,
    /// Auto-dismiss timer expired.
    TimedOut,
}

/// One notification.
#[derive(Clone)]
pub struct ToastRecord {
    pub id: ToastId,
    pub kind: ToastKind,
    pub title: Option<Renderable>,
    pub description: Option<Renderable>,
    /// Set for toasts created with `custom`; the renderer draws it instead
    /// of title and description.
    pub custom: Option<Renderable>,
    /// Duration as requested by the caller.
    pub duration: Option<ToastDuration>,
    /// Resolved auto-dismiss timeout. `None` means never.
    pub timeout: Option<Duration>,
    pub dismissible: bool,
    /// Per-toast override of the viewport's close button setting.
    pub close_button: Option<bool>,
    pub action: Option<ToastAction>,
    pub cancel: Option<ToastAction>,
    pub on_dismiss: Option<Callback>,
    pub on_auto_close: Option<Callback>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub phase: ToastPhase,
}

impl ToastRecord {
    /// Blank active record with library defaults.
    pub(crate) fn blank(id: ToastId, now: Timestamp) -> Self {
        Self {
            id,
            kind: ToastKind::Default,
            title: None,
            description: None,
            custom: None,
            duration: None,
            timeout: None,
            dismissible: true,
            close_button: None,
            action: None,
            cancel: None,
            on_dismiss: None,
            on_auto_close: None,
            created_at: now,
            updated_at: now,
            phase: ToastPhase::Active,
        }
    }

    pub fn title_text(&self) -> Option<&str> {
        self.title.as_ref().and_then(Renderable::as_text)
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_ref().and_then(Renderable::as_text)
    }

    pub fn is_custom(&self) -> bool {
        self.custom.is_some()
    }

    pub fn auto_dismisses(&self) -> bool {
        self.timeout.is_some()
    }
}

impl fmt::Debug for ToastRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToastRecord")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("title", &self.title)
            .field("description", &self.description)
            .field("custom", &self.custom.is_some())
            .field("timeout", &self.timeout)
            .field("dismissible", &self.dismissible)
            .field("phase", &self.phase)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Options bag for creating or patching a toast.
///
/// Every field is optional; on update only the fields that are set replace
/// the record's values.
#[derive(Clone, Default)]
pub struct ToastOptions {
    /// Update-in-place key. Supplying one also resets the timeout to the
    /// update default unless `duration` is set.
    pub id: Option<ToastId>,
    pub kind: Option<ToastKind>,
    pub title: Option<Renderable>,
    pub description: Option<Renderable>,
    pub custom: Option<Renderable>,
    pub duration: Option<ToastDuration>,
    pub dismissible: Option<bool>,
    pub close_button: Option<bool>,
    pub action: Option<ToastAction>,
    pub cancel: Option<ToastAction>,
    pub on_dismiss: Option<Callback>,
    pub on_auto_close: Option<Callback>,
}

impl ToastOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<ToastId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn kind(mut self, kind: ToastKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn title(mut self, title: impl Into<Renderable>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<Renderable>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn duration(mut self, duration: impl Into<ToastDuration>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Never auto-dismiss.
    pub fn infinite(mut self) -> Self {
        self.duration = Some(ToastDuration::Infinite);
        self
    }

    pub fn dismissible(mut self, dismissible: bool) -> Self {
        self.dismissible = Some(dismissible);
        self
    }

    pub fn close_button(mut self, close_button: bool) -> Self {
        self.close_button = Some(close_button);
        self
    }

    pub fn action(mut self, label: impl Into<String>, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.action = Some(ToastAction::new(label, f));
        self
    }

    pub fn cancel(mut self, label: impl Into<String>, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.cancel = Some(ToastAction::new(label, f));
        self
    }

    pub fn on_dismiss(mut self, f: impl Fn(&ToastRecord) + Send + Sync + 'static) -> Self {
        self.on_dismiss = Some(Arc::new(f));
        self
    }

    pub fn on_auto_close(mut self, f: impl Fn(&ToastRecord) + Send + Sync + 'static) -> Self {
        self.on_auto_close = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for ToastOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToastOptions")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("title", &self.title)
            .field("description", &self.description)
            .field("duration", &self.duration)
            .field("dismissible", &self.dismissible)
            .finish_non_exhaustive()
    }
}

/// Immutable view of the active toasts, newest first.
///
/// The first `limit` records are visible; the rest are queued (collapsed)
/// and move up as newer toasts close.
#[derive(Clone, Debug)]
pub struct ToastSnapshot {
    pub(crate) version: u64,
    pub(crate) limit: usize,
    pub(crate) position: Position,
    pub(crate) close_button: bool,
    pub(crate) records: Arc<[ToastRecord]>,
}

impl ToastSnapshot {
    /// Bumped on every published change.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn records(&self) -> &[ToastRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &ToastId) -> Option<&ToastRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn ids(&self) -> Vec<ToastId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    pub fn visible(&self) -> &[ToastRecord] {
        &self.records[..self.limit.min(self.records.len())]
    }

    pub fn hidden(&self) -> &[ToastRecord] {
        &self.records[self.limit.min(self.records.len())..]
    }

    pub fn is_visible(&self, id: &ToastId) -> bool {
        self.visible().iter().any(|r| &r.id == id)
    }

    /// Whether the renderer should draw a close button on `record`.
    pub fn shows_close_button(&self, record: &ToastRecord) -> bool {
        record.close_button.unwrap_or(self.close_button)
    }
}
