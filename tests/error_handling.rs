//! Error handling and edge case tests.

use futures::executor::block_on;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use toastkit::{
    ManualScheduler, PromiseMessages, Scheduler, ThreadScheduler, ToastError, ToastId, ToastKind,
    ToastManager, ToastOptions, ToastRecord, ToastSnapshot, ToasterConfig, UPDATE_DURATION,
};

fn test_manager() -> (ToastManager, Arc<ManualScheduler>) {
    let clock = Arc::new(ManualScheduler::new());
    let toasts = ToastManager::new(ToasterConfig::default(), clock.clone()).unwrap();
    (toasts, clock)
}

// --- Unknown ids ---

#[test]
fn test_dismiss_unknown_id_is_noop() {
    let (toasts, _clock) = test_manager();
    toasts.show("keep", ToastOptions::new());
    let before = toasts.snapshot();

    assert!(!toasts.dismiss(&ToastId::from("unknown-id")));
    assert!(!toasts.user_dismiss(&ToastId::from("unknown-id")));

    // Nothing changed, so the very same snapshot is still current.
    assert!(Arc::ptr_eq(&before, &toasts.snapshot()));
}

#[test]
fn test_update_unknown_id_creates_once() {
    let (toasts, _clock) = test_manager();

    let id = toasts.update("job-42", ToastOptions::new().title("Queued"));
    assert_eq!(id, ToastId::from("job-42"));
    let again = toasts.update("job-42", ToastOptions::new().title("Running"));
    assert_eq!(again, id);

    assert_eq!(toasts.len(), 1);
    let record = toasts.get(&id).unwrap();
    assert_eq!(record.title_text(), Some("Running"));
    assert_eq!(record.kind, ToastKind::Default);
    assert!(record.dismissible);
    assert_eq!(record.timeout, Some(UPDATE_DURATION));
}

#[test]
fn test_show_with_existing_id_updates_in_place() {
    let (toasts, _clock) = test_manager();
    toasts.show("first", ToastOptions::new());
    let id = toasts.error("oops", ToastOptions::new().with_id("status"));
    toasts.show("second", ToastOptions::new());

    toasts.success("fixed", ToastOptions::new().with_id("status"));

    let snapshot = toasts.snapshot();
    assert_eq!(snapshot.len(), 3);
    // Updated in place: still between "second" and "first".
    assert_eq!(snapshot.records()[1].id, id);
    assert_eq!(snapshot.records()[1].kind, ToastKind::Success);
}

// --- Timer races ---

#[test]
fn test_close_then_timer_never_fires_callback() {
    let (toasts, clock) = test_manager();
    let auto_closed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&auto_closed);
    let id = toasts.show(
        "racy",
        ToastOptions::new().on_auto_close(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    toasts.close(&id);
    clock.advance(Duration::from_secs(30));
    assert_eq!(auto_closed.load(Ordering::SeqCst), 0);
}

#[test]
fn test_repeated_updates_keep_one_timer() {
    let (toasts, clock) = test_manager();
    let id = toasts.show("progress 0%", ToastOptions::new());
    for pct in (10..=100).step_by(10) {
        clock.advance(Duration::from_millis(100));
        toasts.update(&id, ToastOptions::new().title(format!("progress {}%", pct)));
        assert_eq!(clock.pending(), 1);
    }
    assert_eq!(toasts.get(&id).unwrap().title_text(), Some("progress 100%"));
}

#[test]
fn test_update_to_loading_disarms_timer() {
    let (toasts, clock) = test_manager();
    let id = toasts.show("retrying", ToastOptions::new());
    toasts.update(&id, ToastOptions::new().kind(ToastKind::Loading));
    assert_eq!(clock.pending(), 0);

    clock.advance(Duration::from_secs(600));
    assert!(toasts.contains(&id));
}

#[test]
fn test_zero_duration_never_dismisses() {
    let (toasts, clock) = test_manager();
    let id = toasts.warning("sticky", ToastOptions::new().duration(Duration::ZERO));
    assert_eq!(toasts.get(&id).unwrap().timeout, None);
    clock.advance(Duration::from_secs(600));
    assert!(toasts.contains(&id));
}

// --- Dismissibility ---

#[test]
fn test_non_dismissible_refuses_gestures() {
    let (toasts, _clock) = test_manager();
    let dismissed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&dismissed);
    let id = toasts.show(
        "Must read",
        ToastOptions::new().dismissible(false).on_dismiss(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );
    let before = toasts.snapshot();

    assert!(!toasts.user_dismiss(&id));
    assert!(toasts.contains(&id));
    assert!(Arc::ptr_eq(&before, &toasts.snapshot()));
    assert_eq!(dismissed.load(Ordering::SeqCst), 0);

    // Application code can still close it.
    assert!(toasts.close(&id));
    assert_eq!(dismissed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_non_dismissible_still_times_out() {
    let (toasts, clock) = test_manager();
    let id = toasts.show("brief", ToastOptions::new().dismissible(false));
    clock.advance(Duration::from_millis(5000));
    assert!(!toasts.contains(&id));
}

// --- Promise tracking ---

#[test]
fn test_panicking_descriptor_propagates() {
    let (toasts, _clock) = test_manager();
    let tracked = toasts.promise(
        async { Ok::<u32, ()>(1) },
        PromiseMessages::new("Working").success_with(|_: &u32| -> String {
            panic!("descriptor bug");
        }),
    );
    let id = tracked.id().clone();

    assert_eq!(toasts.get(&id).unwrap().kind, ToastKind::Loading);

    let result = panic::catch_unwind(AssertUnwindSafe(|| block_on(tracked)));
    assert!(result.is_err());
    // The panic is not swallowed, and no spinner is left behind.
    assert!(!toasts.contains(&id));
    assert!(toasts.is_empty());
}

#[test]
fn test_promise_after_user_dismissed_loading_toast() {
    let (toasts, _clock) = test_manager();
    let tracked = toasts.promise(
        async { Ok::<_, ()>(()) },
        PromiseMessages::new("Loading").success("Done"),
    );
    let id = tracked.id().clone();
    toasts.user_dismiss(&id);
    assert!(toasts.is_empty());

    block_on(tracked).unwrap();
    // The terminal update targets the same id and never duplicates it.
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts.get(&id).unwrap().title_text(), Some("Done"));
}

// --- Configuration ---

#[test]
fn test_invalid_config_rejected() {
    let clock = Arc::new(ManualScheduler::new());
    let result = ToastManager::new(
        ToasterConfig {
            limit: 0,
            ..Default::default()
        },
        clock,
    );
    assert!(matches!(result, Err(ToastError::InvalidConfig(_))));
}

#[test]
fn test_config_type_mismatch() {
    let result = ToasterConfig::from_json(r#"{"duration_ms": "five seconds"}"#);
    assert!(matches!(result, Err(ToastError::Deserialization(_))));
}

// --- Real clock ---

#[test]
fn test_thread_scheduler_auto_dismisses() {
    let scheduler = Arc::new(ThreadScheduler::spawn().unwrap());
    let config = ToasterConfig {
        duration: Duration::from_millis(30),
        ..Default::default()
    };
    let toasts = ToastManager::new(config, scheduler.clone()).unwrap();
    let (tx, rx) = crossbeam_channel::bounded(1);

    let id = toasts.show(
        "quick",
        ToastOptions::new().on_auto_close(move |record| {
            let _ = tx.try_send(record.id.clone());
        }),
    );

    let closed = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(closed, id);
    assert!(scheduler.now().as_millis() >= 30);
}

#[test]
fn test_listeners_never_see_older_snapshot_across_threads() {
    let (toasts, _clock) = test_manager();
    let newest = Arc::new(AtomicU64::new(0));
    let out_of_order = Arc::new(AtomicUsize::new(0));
    let (seen, stale) = (Arc::clone(&newest), Arc::clone(&out_of_order));
    let _sub = toasts.subscribe(move |snapshot| {
        if seen.fetch_max(snapshot.version(), Ordering::SeqCst) >= snapshot.version() {
            stale.fetch_add(1, Ordering::SeqCst);
        }
    });

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let toasts = toasts.clone();
            thread::spawn(move || {
                for _ in 0..2000 {
                    let id = toasts.show("busy", ToastOptions::new());
                    toasts.dismiss(&id);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(out_of_order.load(Ordering::SeqCst), 0);
    assert!(toasts.is_empty());
    // The listener ends on the current collection.
    assert_eq!(newest.load(Ordering::SeqCst), toasts.snapshot().version());
}

#[test]
fn test_updates_racing_real_timer_expiry() {
    let scheduler = Arc::new(ThreadScheduler::spawn().unwrap());
    let toasts = ToastManager::new(ToasterConfig::default(), scheduler.clone()).unwrap();

    let last: Arc<Mutex<Option<Arc<ToastSnapshot>>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&last);
    let _sub = toasts.subscribe(move |snapshot| {
        *sink.lock() = Some(Arc::clone(snapshot));
    });

    // An auto-close is only legitimate once the latest arming has run out.
    let early = Arc::new(AtomicUsize::new(0));
    let on_auto_close = {
        let early = Arc::clone(&early);
        let clock = Arc::clone(&scheduler);
        move |record: &ToastRecord| {
            let timeout = record.timeout.map_or(0, |t| t.as_millis() as u64);
            if clock.now().as_millis() < record.updated_at.as_millis() + timeout {
                early.fetch_add(1, Ordering::SeqCst);
            }
        }
    };

    let workers: Vec<_> = (0..4)
        .map(|n| {
            let toasts = toasts.clone();
            let on_auto_close = on_auto_close.clone();
            thread::spawn(move || {
                let key = format!("job-{}", n);
                for i in 0..40u64 {
                    toasts.update(
                        key.as_str(),
                        ToastOptions::new()
                            .title(format!("step {}", i))
                            .duration(Duration::from_millis(15))
                            .on_auto_close(on_auto_close.clone()),
                    );
                    thread::sleep(Duration::from_millis((i % 7) * 4));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    thread::sleep(Duration::from_millis(50));
    toasts.dismiss_all();

    assert_eq!(early.load(Ordering::SeqCst), 0);

    // A timer close may still be finishing on the timer thread.
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let current = toasts.snapshot();
        let delivered = last.lock().clone();
        if delivered.as_ref().map(|s| s.version()) == Some(current.version()) {
            assert!(Arc::ptr_eq(&delivered.unwrap(), &current));
            break;
        }
        assert!(Instant::now() < deadline, "listener never caught up");
        thread::sleep(Duration::from_millis(5));
    }
    assert!(toasts.is_empty());
}
