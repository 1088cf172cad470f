use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::{Handle, Runtime};

/// A source of the current time, in unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// The wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        Utc::now().timestamp_millis() as u64
    }
}

/// A one-shot piece of work scheduled for later.
pub type Task = Box<dyn FnOnce() + Send>;

/// Schedules one-shot tasks. A task may fire after the state it was scheduled
/// for has changed, so it must re-check that state before acting.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay_ms: u64, task: Task) -> TimerHandle;
}

/// A handle to a scheduled task. Dropping the handle does not cancel the task.
#[derive(Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Prevents the task from running, if it has not fired yet
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst)
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Schedules tasks on the tokio runtime.
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            handle: get_or_create_handle(),
        }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay_ms: u64, task: Task) -> TimerHandle {
        let handle = TimerHandle::new();
        let task_handle = handle.clone();

        self.handle.spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;

            if !task_handle.is_cancelled() {
                task()
            }
        });

        handle
    }
}

/// Returns the current tokio handle, or creates a new runtime if none exists.
fn get_or_create_handle() -> Handle {
    Handle::try_current().ok().unwrap_or_else(|| {
        let runtime = Runtime::new().expect("fallback runtime is created");
        let handle = runtime.handle().clone();

        // The runtime has to outlive every task scheduled on it
        std::mem::forget(runtime);
        handle
    })
}

#[cfg(test)]
pub use manual::ManualTime;

#[cfg(test)]
mod manual {
    use parking_lot::Mutex;

    use super::*;

    /// A clock and scheduler driven by tests.
    pub struct ManualTime {
        now: Mutex<u64>,
        pending: Mutex<Vec<PendingTask>>,
    }

    struct PendingTask {
        fire_at: u64,
        handle: TimerHandle,
        task: Option<Task>,
    }

    impl ManualTime {
        pub fn new(start_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(start_ms),
                pending: Default::default(),
            })
        }

        /// Moves time forward, firing every task that comes due, in order
        pub fn advance(&self, delta_ms: u64) {
            let target = *self.now.lock() + delta_ms;

            loop {
                let next = {
                    let mut pending = self.pending.lock();
                    pending.sort_by_key(|t| t.fire_at);

                    pending
                        .iter()
                        .position(|t| t.fire_at <= target)
                        .map(|i| pending.remove(i))
                };

                let Some(mut next) = next else { break };

                {
                    let mut now = self.now.lock();
                    *now = next.fire_at.max(*now);
                }

                if !next.handle.is_cancelled() {
                    if let Some(task) = next.task.take() {
                        task()
                    }
                }
            }

            *self.now.lock() = target;
        }
    }

    impl Clock for ManualTime {
        fn now_ms(&self) -> u64 {
            *self.now.lock()
        }
    }

    impl Scheduler for ManualTime {
        fn schedule(&self, delay_ms: u64, task: Task) -> TimerHandle {
            let handle = TimerHandle::new();

            self.pending.lock().push(PendingTask {
                fire_at: self.now_ms() + delay_ms,
                handle: handle.clone(),
                task: Some(task),
            });

            handle
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::{ManualTime, Scheduler};

    #[test]
    fn tasks_fire_in_order_once_due() {
        let time = ManualTime::new(0);
        let fired = Arc::new(AtomicUsize::new(0));

        let first = fired.clone();
        time.schedule(
            100,
            Box::new(move || {
                first.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let second = fired.clone();
        time.schedule(
            200,
            Box::new(move || {
                second.fetch_add(10, Ordering::SeqCst);
            }),
        );

        time.advance(99);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        time.advance(1);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        time.advance(100);
        assert_eq!(fired.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let time = ManualTime::new(0);
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        let handle = time.schedule(
            50,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        handle.cancel();
        time.advance(100);

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
