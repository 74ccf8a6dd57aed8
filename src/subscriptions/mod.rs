//! Subscription system for toast changes.
//!
//! Two flavours:
//! - Snapshot listeners: a callback receiving the full ordered toast list
//!   after every change (what a viewport renders from)
//! - Event channels: bounded channels of lifecycle events (added, updated,
//!   closed), filterable by kind, with slow-subscriber dropping
//!
//! # Example
//!
//! ```ignore
//! let subscription = toasts.subscribe(|snapshot| {
//!     for record in snapshot.visible() {
//!         draw(record);
//!     }
//! });
//!
//! let events = toasts.subscribe_events(EventConfig {
//!     filter: EventFilter::closes(),
//!     ..Default::default()
//! });
//! while let Ok(event) = events.recv() {
//!     println!("{:?}", event);
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, EventConfig, EventFilter, EventHandle, Listener, Subscription, SubscriptionId,
    ToastEvent,
};
