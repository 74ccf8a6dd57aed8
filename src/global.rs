//! Process-wide default manager.
//!
//! For applications that want a single toaster reachable from anywhere.
//! Everything here delegates to [`global()`], a [`ToastManager`] with the
//! default config and a [`ThreadScheduler`]. Code that needs a different
//! config or deterministic timers should build its own manager instead.

use crate::manager::ToastManager;
use crate::promise::{PromiseMessages, PromiseToast};
use crate::scheduler::ThreadScheduler;
use crate::types::{Renderable, ToastId, ToastOptions};
use std::future::Future;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<ToastManager> = OnceLock::new();

/// The process-wide manager, created on first use.
pub fn global() -> &'static ToastManager {
    GLOBAL.get_or_init(|| {
        let scheduler = ThreadScheduler::spawn().expect("failed to spawn toast timer thread");
        ToastManager::with_scheduler(Arc::new(scheduler))
    })
}

pub fn toast(title: impl Into<Renderable>, options: ToastOptions) -> ToastId {
    global().show(title, options)
}

pub fn success(title: impl Into<Renderable>, options: ToastOptions) -> ToastId {
    global().success(title, options)
}

pub fn error(title: impl Into<Renderable>, options: ToastOptions) -> ToastId {
    global().error(title, options)
}

pub fn warning(title: impl Into<Renderable>, options: ToastOptions) -> ToastId {
    global().warning(title, options)
}

pub fn info(title: impl Into<Renderable>, options: ToastOptions) -> ToastId {
    global().info(title, options)
}

pub fn loading(title: impl Into<Renderable>, options: ToastOptions) -> ToastId {
    global().loading(title, options)
}

pub fn update(id: impl Into<ToastId>, patch: ToastOptions) -> ToastId {
    global().update(id, patch)
}

pub fn dismiss(id: &ToastId) -> bool {
    global().dismiss(id)
}

pub fn dismiss_all() -> usize {
    global().dismiss_all()
}

pub fn promise<'a, T, E, F>(future: F, messages: PromiseMessages<T, E>) -> PromiseToast<'a, T, E>
where
    F: Future<Output = Result<T, E>> + 'a,
    T: 'a,
    E: 'a,
{
    global().promise(future, messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToastKind;

    #[test]
    fn test_global_is_shared() {
        let id = success("from anywhere", ToastOptions::new().with_id("global-test"));
        let record = global().get(&id).unwrap();
        assert_eq!(record.kind, ToastKind::Success);

        assert!(dismiss(&id));
        assert!(!global().contains(&id));
    }
}
