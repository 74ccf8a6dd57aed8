//! # Toastkit
//!
//! A framework-agnostic manager for toast notifications: short-lived
//! messages that dismiss themselves, update in place and follow the
//! outcome of async work.
//!
//! ## Core Concepts
//!
//! - **Records**: one toast each, keyed by a unique id
//! - **Manager**: owns the newest-first list, the timers and the subscribers
//! - **Limit**: only the newest `limit` toasts are visible, the rest queue
//! - **Scheduler**: injectable timers, real or manually driven
//! - **Promise tracking**: one toast following a future from loading to done
//!
//! ## Example
//!
//! ```ignore
//! use toastkit::{ManualScheduler, PromiseMessages, ToastManager, ToastOptions, ToasterConfig};
//!
//! let clock = Arc::new(ManualScheduler::new());
//! let toasts = ToastManager::new(ToasterConfig::default(), clock.clone())?;
//!
//! // Render whatever is visible after each change
//! let _sub = toasts.subscribe(|snapshot| {
//!     for record in snapshot.visible() {
//!         println!("{:?}", record.title);
//!     }
//! });
//!
//! toasts.success("Saved", ToastOptions::new());
//!
//! let user = toasts
//!     .promise(fetch_user(), PromiseMessages::new("Loading user").success("Done"))
//!     .await?;
//! ```

pub mod config;
pub mod error;
pub mod global;
pub mod manager;
pub mod promise;
pub mod record;
pub mod scheduler;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use config::{Position, ToasterConfig, DEFAULT_DURATION, DEFAULT_LIMIT};
pub use error::{Result, ToastError};
pub use global::global;
pub use manager::ToastManager;
pub use promise::{Descriptor, Message, PromiseMessages, PromiseToast};
pub use record::{resolve_timeout, UPDATE_DURATION};
pub use scheduler::{ManualScheduler, Scheduler, Task, ThreadScheduler, TimerToken};
pub use subscriptions::{
    DropReason, EventConfig, EventFilter, EventHandle, Subscription, SubscriptionId, ToastEvent,
};
pub use types::*;
