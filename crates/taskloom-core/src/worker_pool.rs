//! Fixed pool of worker threads draining the task queue
//!
//! Each worker blocks in [`TaskQueue::pop_blocking`], runs the current task handler
//! with panics caught, records the outcome and drops the task. A failing handler
//! never takes a worker down; workers exit only when the queue reports shutdown.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::handler::{run_isolated, HandlerOutcome, HandlerSlot, TaskHandler};
use crate::scheduler::SchedulerStats;
use crate::task_queue::TaskQueue;

/// Worker count when none is configured: available parallelism, at least one
#[must_use]
pub fn default_worker_count() -> usize {
    thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .max(1)
}

/// Fixed-size pool of OS threads
pub struct WorkerPool {
    worker_count: usize,
    name_prefix: String,
    queue: Arc<TaskQueue>,
    handler: Arc<HandlerSlot<dyn TaskHandler>>,
    stats: Arc<SchedulerStats>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Create a pool; no threads are started until [`WorkerPool::start`]
    pub fn new(
        worker_count: usize,
        queue: Arc<TaskQueue>,
        handler: Arc<HandlerSlot<dyn TaskHandler>>,
        stats: Arc<SchedulerStats>,
    ) -> Self {
        Self {
            worker_count: worker_count.max(1),
            name_prefix: "taskloom".to_string(),
            queue,
            handler,
            stats,
            workers: Vec::new(),
        }
    }

    /// Set the thread name prefix (`<prefix>-worker-<n>`)
    #[must_use]
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Number of workers this pool runs
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Number of worker threads currently spawned
    #[must_use]
    pub fn running(&self) -> usize {
        self.workers.len()
    }

    /// Spawn the worker threads
    ///
    /// If a spawn fails the threads already started keep running until shutdown and
    /// are joined by [`WorkerPool::stop`].
    pub fn start(&mut self) -> Result<()> {
        for index in self.workers.len()..self.worker_count {
            let queue = self.queue.clone();
            let handler = self.handler.clone();
            let stats = self.stats.clone();
            let name = format!("{}-worker-{}", self.name_prefix, index);
            let handle = thread::Builder::new()
                .name(name)
                .spawn(move || worker_loop(index, &queue, &handler, &stats))?;
            self.workers.push(handle);
        }
        info!(workers = self.worker_count, "Worker pool started");
        Ok(())
    }

    /// Join every worker. Call after shutdown has been requested.
    ///
    /// Returns the number of workers that terminated abnormally.
    pub fn stop(&mut self) -> usize {
        let mut abnormal = 0;
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                error!(worker = %name, "Worker thread terminated abnormally");
                abnormal += 1;
            }
        }
        info!("Worker pool stopped");
        abnormal
    }
}

fn worker_loop(
    index: usize,
    queue: &TaskQueue,
    handler: &HandlerSlot<dyn TaskHandler>,
    stats: &SchedulerStats,
) {
    debug!(worker = index, "Worker started");

    while let Some(task) = queue.pop_blocking() {
        let Some(current) = handler.get() else {
            warn!(worker = index, task_id = %task.id, source = %task.source, "No task handler registered, dropping task");
            stats.add_failed(1);
            continue;
        };

        match run_isolated(|| current.handle(&task)) {
            HandlerOutcome::Completed => {
                debug!(worker = index, task_id = %task.id, source = %task.source, "Task completed");
                stats.add_completed(1);
            }
            HandlerOutcome::Failed(e) => {
                warn!(worker = index, task_id = %task.id, source = %task.source, error = %e, "Task handler failed");
                stats.add_failed(1);
            }
            HandlerOutcome::Panicked(message) => {
                error!(worker = index, task_id = %task.id, source = %task.source, panic = %message, "Task handler panicked");
                stats.add_failed(1);
            }
        }
    }

    debug!(worker = index, "Worker exiting");
}
