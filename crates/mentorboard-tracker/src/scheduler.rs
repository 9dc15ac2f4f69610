//! Cooperative task scheduler
//!
//! Every delayed piece of work (stagger slots, debounced expansion, delayed
//! week switches) runs as a tracked tokio task so it can be cancelled one at
//! a time, per debounce slot, or all together on refresh and teardown.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Liveness flag for the view that owns an async operation.
///
/// Cloned into every operation and checked once before results are
/// committed to shared state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// Handle to a scheduled task
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaskId(u64);

struct Tracked {
    handle: JoinHandle<()>,
    slot: Option<String>,
}

#[derive(Default)]
struct Registry {
    tasks: HashMap<TaskId, Tracked>,
    slots: HashMap<String, TaskId>,
}

impl Registry {
    fn remove(&mut self, id: TaskId) -> Option<Tracked> {
        let tracked = self.tasks.remove(&id)?;
        if let Some(slot) = &tracked.slot {
            if self.slots.get(slot) == Some(&id) {
                self.slots.remove(slot);
            }
        }
        Some(tracked)
    }
}

/// Delayed task scheduler with group cancellation
#[derive(Clone, Default)]
pub struct Scheduler {
    registry: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay` unless `token` is cancelled first
    pub fn schedule<F>(&self, delay: Duration, token: CancelToken, task: F) -> TaskId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_tracked(None, delay, token, task)
    }

    /// Debounce: run `task` after `delay`, replacing any task still pending on `slot`
    pub fn schedule_slot<F>(
        &self,
        slot: impl Into<String>,
        delay: Duration,
        token: CancelToken,
        task: F,
    ) -> TaskId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_tracked(Some(slot.into()), delay, token, task)
    }

    /// Schedule one task per item, each `step` later than the previous
    pub fn stagger<I, F, Fut>(&self, step: Duration, token: CancelToken, items: I, mut make: F) -> Vec<TaskId>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                let slot = u32::try_from(i).unwrap_or(u32::MAX);
                self.schedule(step.saturating_mul(slot), token.clone(), make(item))
            })
            .collect()
    }

    fn spawn_tracked<F>(
        &self,
        slot: Option<String>,
        delay: Duration,
        token: CancelToken,
        task: F,
    ) -> TaskId
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let registry = self.registry.clone();

        // Lock is held across the spawn so the task cannot deregister
        // itself before it has been registered.
        let mut guard = self.registry.lock();
        if let Some(slot) = &slot {
            if let Some(previous) = guard.slots.get(slot).copied() {
                if let Some(tracked) = guard.remove(previous) {
                    tracked.handle.abort();
                    debug!(slot = %slot, "Replaced pending task");
                }
            }
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !token.is_cancelled() {
                task.await;
            } else {
                trace!("Skipped task for cancelled view");
            }
            registry.lock().remove(id);
        });

        if let Some(slot) = &slot {
            guard.slots.insert(slot.clone(), id);
        }
        guard.tasks.insert(id, Tracked { handle, slot });
        id
    }

    /// Abort one task
    pub fn cancel(&self, id: TaskId) -> bool {
        match self.registry.lock().remove(id) {
            Some(tracked) => {
                tracked.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Abort whatever is pending on a debounce slot
    pub fn cancel_slot(&self, slot: &str) -> bool {
        let mut guard = self.registry.lock();
        match guard.slots.get(slot).copied() {
            Some(id) => {
                if let Some(tracked) = guard.remove(id) {
                    tracked.handle.abort();
                }
                true
            }
            None => false,
        }
    }

    /// Abort every pending task, returning how many were cancelled
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<Tracked> = {
            let mut guard = self.registry.lock();
            guard.slots.clear();
            guard.tasks.drain().map(|(_, tracked)| tracked).collect()
        };
        for tracked in &drained {
            tracked.handle.abort();
        }
        if !drained.is_empty() {
            debug!(count = drained.len(), "Cancelled pending tasks");
        }
        drained.len()
    }

    /// Number of tasks not yet finished
    pub fn pending(&self) -> usize {
        self.registry.lock().tasks.len()
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.registry.lock().tasks.contains_key(&id)
    }
}
