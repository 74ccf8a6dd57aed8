//! Real-time scheduler backed by a dedicated timer thread.

use super::{Scheduler, Task, TimerToken};
use crate::error::Result;
use crate::types::Timestamp;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

enum Command {
    Schedule {
        token: TimerToken,
        deadline: Instant,
        task: Task,
    },
    Cancel(TimerToken),
    Shutdown,
}

/// Scheduler running tasks on a background thread.
///
/// Tasks run on the timer thread one at a time. The thread stops when the
/// scheduler is dropped; pending tasks are discarded.
pub struct ThreadScheduler {
    origin: Instant,
    next_token: AtomicU64,
    commands: Sender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadScheduler {
    /// Start the timer thread.
    pub fn spawn() -> Result<Self> {
        let (commands, receiver) = unbounded();
        let worker = thread::Builder::new()
            .name("toast-timers".into())
            .spawn(move || run(receiver))?;

        Ok(Self {
            origin: Instant::now(),
            next_token: AtomicU64::new(1),
            commands,
            worker: Mutex::new(Some(worker)),
        })
    }
}

impl Scheduler for ThreadScheduler {
    fn now(&self) -> Timestamp {
        Timestamp(u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX))
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerToken {
        let token = TimerToken(self.next_token.fetch_add(1, Ordering::SeqCst));
        let command = Command::Schedule {
            token,
            deadline: Instant::now() + delay,
            task,
        };
        if self.commands.send(command).is_err() {
            tracing::warn!(token = token.0, "timer thread is gone, task dropped");
        }
        token
    }

    fn cancel(&self, token: TimerToken) {
        // Fails only after shutdown, when nothing is pending anyway.
        let _ = self.commands.send(Command::Cancel(token));
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.lock().take() {
            // A task may drop the last manager handle on the timer thread itself.
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

fn run(commands: Receiver<Command>) {
    let mut queue: BTreeMap<(Instant, TimerToken), Task> = BTreeMap::new();
    let mut deadlines: HashMap<TimerToken, Instant> = HashMap::new();

    loop {
        let next = queue.keys().next().copied();
        let received = match next {
            Some(key) => {
                let now = Instant::now();
                if key.0 <= now {
                    deadlines.remove(&key.1);
                    if let Some(task) = queue.remove(&key) {
                        task();
                    }
                    continue;
                }
                commands.recv_timeout(key.0 - now)
            }
            None => commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(Command::Schedule {
                token,
                deadline,
                task,
            }) => {
                queue.insert((deadline, token), task);
                deadlines.insert(token, deadline);
            }
            Ok(Command::Cancel(token)) => {
                if let Some(deadline) = deadlines.remove(&token) {
                    queue.remove(&(deadline, token));
                }
            }
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }

    tracing::trace!(discarded = queue.len(), "timer thread stopped");
}
