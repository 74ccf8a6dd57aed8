//! Deterministic scheduler driven by an explicit clock.

use super::{Scheduler, Task, TimerToken};
use crate::types::Timestamp;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

struct ManualState {
    now: Timestamp,
    next_token: u64,
    /// Pending tasks ordered by (deadline, token).
    queue: BTreeMap<(Timestamp, TimerToken), Task>,
    deadlines: HashMap<TimerToken, Timestamp>,
}

/// Scheduler whose clock only moves when [`advance`](Self::advance) is called.
///
/// Due tasks fire in deadline order, ties in scheduling order. Tasks run
/// without the scheduler lock held, so they may schedule or cancel further
/// tasks; a task scheduled inside the advanced window fires in the same call.
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: Timestamp(0),
                next_token: 1,
                queue: BTreeMap::new(),
                deadlines: HashMap::new(),
            }),
        }
    }

    /// Move the clock forward, firing every task that falls due.
    /// Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now.after(by);
        let mut fired = 0;

        loop {
            let task = {
                let mut state = self.state.lock();
                let due = match state.queue.keys().next() {
                    Some(&(deadline, token)) if deadline <= target => Some((deadline, token)),
                    _ => None,
                };
                match due {
                    Some(key) => {
                        state.deadlines.remove(&key.1);
                        if key.0 > state.now {
                            state.now = key.0;
                        }
                        state.queue.remove(&key)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };

            match task {
                Some(task) => {
                    task();
                    fired += 1;
                }
                None => break,
            }
        }

        fired
    }

    /// Number of tasks waiting to fire.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Deadline of the next pending task.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.state.lock().queue.keys().next().map(|&(deadline, _)| deadline)
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Timestamp {
        self.state.lock().now
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerToken {
        let mut state = self.state.lock();
        let token = TimerToken(state.next_token);
        state.next_token += 1;
        let deadline = state.now.after(delay);
        state.queue.insert((deadline, token), task);
        state.deadlines.insert(token, deadline);
        token
    }

    fn cancel(&self, token: TimerToken) {
        let mut state = self.state.lock();
        if let Some(deadline) = state.deadlines.remove(&token) {
            state.queue.remove(&(deadline, token));
        }
    }
}
