//! Toast record construction and timeout resolution.

use crate::types::{ToastDuration, ToastId, ToastKind, ToastOptions, ToastRecord, Timestamp};
use std::time::Duration;

/// Timeout applied when a toast is updated by id without a duration, so an
/// updated toast never inherits a nearly expired timer.
pub const UPDATE_DURATION: Duration = Duration::from_millis(5000);

/// Resolve the auto-dismiss timeout. `None` means never.
///
/// Priority:
/// 1. `Infinite` disables the timeout.
/// 2. A finite requested duration is used verbatim (zero disables).
/// 3. `Loading` toasts never time out.
/// 4. Toasts addressed by id get [`UPDATE_DURATION`].
/// 5. Everything else gets `default`.
pub fn resolve_timeout(
    requested: Option<ToastDuration>,
    kind: ToastKind,
    id_supplied: bool,
    default: Duration,
) -> Option<Duration> {
    match requested {
        Some(ToastDuration::Infinite) => None,
        Some(ToastDuration::Finite(d)) => non_zero(d),
        None if kind == ToastKind::Loading => None,
        None if id_supplied => Some(UPDATE_DURATION),
        None => non_zero(default),
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    if d.is_zero() {
        None
    } else {
        Some(d)
    }
}

/// Build a fully resolved record. No side effects.
pub fn build(
    id: ToastId,
    options: ToastOptions,
    id_supplied: bool,
    default_duration: Duration,
    now: Timestamp,
) -> ToastRecord {
    let mut record = ToastRecord::blank(id, now);
    merge(&mut record, options);
    record.timeout = resolve_timeout(record.duration, record.kind, id_supplied, default_duration);
    record
}

/// Merge a patch into an existing record and re-resolve its timeout.
///
/// The record keeps its requested duration unless the patch sets one.
pub fn apply(record: &mut ToastRecord, patch: ToastOptions, default_duration: Duration, now: Timestamp) {
    merge(record, patch);
    record.timeout = resolve_timeout(record.duration, record.kind, true, default_duration);
    record.updated_at = now;
}

fn merge(record: &mut ToastRecord, patch: ToastOptions) {
    let ToastOptions {
        id: _,
        kind,
        title,
        description,
        custom,
        duration,
        dismissible,
        close_button,
        action,
        cancel,
        on_dismiss,
        on_auto_close,
    } = patch;

    if let Some(kind) = kind {
        record.kind = kind;
    }
    if title.is_some() {
        record.title = title;
    }
    if description.is_some() {
        record.description = description;
    }
    if custom.is_some() {
        // Custom content is opaque and replaces any text content.
        record.title = None;
        record.description = None;
        record.custom = custom;
    }
    if duration.is_some() {
        record.duration = duration;
    }
    if let Some(dismissible) = dismissible {
        record.dismissible = dismissible;
    }
    if close_button.is_some() {
        record.close_button = close_button;
    }
    if action.is_some() {
        record.action = action;
    }
    if cancel.is_some() {
        record.cancel = cancel;
    }
    if on_dismiss.is_some() {
        record.on_dismiss = on_dismiss;
    }
    if on_auto_close.is_some() {
        record.on_auto_close = on_auto_close;
    }
}
