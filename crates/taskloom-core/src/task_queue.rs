//! Thread-safe FIFO task buffer
//!
//! Producers push from any thread; worker threads park in [`TaskQueue::pop_blocking`]
//! until a task arrives or the scheduler's shutdown flag is set. Once the flag is set
//! no further tasks are handed out, even if some remain queued.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use tracing::trace;

use crate::error::Result;
use crate::shutdown::{ShutdownFlag, Wakeable};
use crate::task::Task;

/// FIFO queue of pending tasks
#[derive(Debug)]
pub struct TaskQueue {
    items: Mutex<VecDeque<Task>>,
    available: Condvar,
    shutdown: ShutdownFlag,
}

impl TaskQueue {
    /// Create an empty queue bound to `shutdown`
    #[must_use]
    pub fn new(shutdown: ShutdownFlag) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            shutdown,
        }
    }

    /// Append a task and wake one waiting worker
    ///
    /// On allocation failure the queue is left untouched.
    pub fn push(&self, task: Task) -> Result<()> {
        let mut items = self.items.lock();
        items.try_reserve(1)?;
        trace!(task_id = %task.id, source = %task.source, depth = items.len() + 1, "Task queued");
        items.push_back(task);
        drop(items);
        self.available.notify_one();
        Ok(())
    }

    /// Remove the head task, blocking while the queue is empty
    ///
    /// Returns `None` once shutdown has been requested.
    pub fn pop_blocking(&self) -> Option<Task> {
        let mut items = self.items.lock();
        loop {
            if self.shutdown.is_set() {
                return None;
            }
            if let Some(task) = items.pop_front() {
                return Some(task);
            }
            self.available.wait(&mut items);
        }
    }

    /// Remove the head task without blocking
    pub fn try_pop(&self) -> Option<Task> {
        self.items.lock().pop_front()
    }

    /// Remove and return every queued task
    pub fn drain(&self) -> Vec<Task> {
        self.items.lock().drain(..).collect()
    }

    /// Number of queued tasks
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl Wakeable for TaskQueue {
    fn wake_all(&self) {
        // Taking the lock orders this notify after any waiter's flag check.
        let _items = self.items.lock();
        self.available.notify_all();
    }
}
