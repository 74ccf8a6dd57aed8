//! Timer scheduling for auto-dismissal.
//!
//! The manager never reads the wall clock or sleeps itself. It asks a
//! [`Scheduler`] to run a task after a delay and cancels the task when the
//! toast is updated or closed first.
//!
//! - [`ManualScheduler`]: virtual clock advanced by the host (tests, frame loops)
//! - [`ThreadScheduler`]: background timer thread on the real clock

mod manual;
mod thread;

pub use manual::ManualScheduler;
pub use thread::ThreadScheduler;

use crate::types::Timestamp;
use std::time::Duration;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle for cancelling a scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerToken(pub u64);

/// Runs tasks after a delay.
pub trait Scheduler: Send + Sync {
    /// Current time on this scheduler's clock.
    fn now(&self) -> Timestamp;

    /// Run `task` once `delay` has elapsed.
    fn schedule(&self, delay: Duration, task: Task) -> TimerToken;

    /// Cancel a pending task. Unknown or already fired tokens are ignored.
    fn cancel(&self, token: TimerToken);
}
