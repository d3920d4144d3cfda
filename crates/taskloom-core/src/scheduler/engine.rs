//! Scheduler orchestrator
//!
//! Owns the queues, the cron table, the handler slots and the shutdown coordinator,
//! and drives the `Created → Running → ShuttingDown → Stopped → Closed` lifecycle.

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::SchedulerConfig;
use super::stats::{SchedulerStats, StatsSnapshot};
use super::timer::{self, TickReport};
use crate::clock::{Clock, MonotonicClock};
use crate::cron::{CronJob, CronJobDefinition, CronSchedule, CronTable};
use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::event_queue::EventQueue;
use crate::handler::{EventHandler, HandlerSlot, TaskHandler};
use crate::shutdown::{SchedulerState, ShutdownCoordinator, ShutdownFlag, Wakeable};
use crate::task::{copy_payload, copy_str, Task, TaskSource};
use crate::task_queue::TaskQueue;
use crate::worker_pool::WorkerPool;

/// State shared between the scheduler handle, the timer thread and the workers
pub(super) struct Shared {
    pub(super) config: SchedulerConfig,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) tasks: Arc<TaskQueue>,
    pub(super) events: Arc<EventQueue>,
    pub(super) cron: CronTable,
    pub(super) shutdown: ShutdownCoordinator,
    pub(super) task_handler: Arc<HandlerSlot<dyn TaskHandler>>,
    pub(super) event_handler: HandlerSlot<dyn EventHandler>,
    pub(super) stats: Arc<SchedulerStats>,
}

/// Background task, event and cron scheduler
///
/// `Scheduler` is a cheap handle: clones share the same queues and threads, so one
/// clone can block in [`Scheduler::run`] while others add work or request shutdown.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    /// Create a scheduler on the process monotonic clock
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Create a scheduler on a custom clock
    pub fn with_clock(config: SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        let flag = ShutdownFlag::new();
        let tasks = Arc::new(TaskQueue::new(flag.clone()));
        let events = Arc::new(EventQueue::new(flag.clone()));
        let waiters: Vec<Arc<dyn Wakeable>> = vec![tasks.clone(), events.clone()];

        Self {
            shared: Arc::new(Shared {
                config,
                clock,
                tasks,
                events,
                cron: CronTable::new(),
                shutdown: ShutdownCoordinator::new(flag, waiters),
                task_handler: Arc::new(HandlerSlot::empty()),
                event_handler: HandlerSlot::empty(),
                stats: Arc::new(SchedulerStats::default()),
            }),
        }
    }

    /// Install the task handler, replacing any previous one
    pub fn set_task_handler<H>(&self, handler: H)
    where
        H: TaskHandler + 'static,
    {
        self.shared.task_handler.set(Arc::new(handler));
    }

    /// Install the handler for `Shutdown` and `Heartbeat` events
    pub fn set_event_handler<H>(&self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.shared.event_handler.set(Arc::new(handler));
    }

    /// Queue a task, copying `id` and `data`
    pub fn add_task(&self, id: &str, data: &[u8], source: impl Into<TaskSource>) -> Result<()> {
        self.enqueue(Task::copied(id, data, source)?)
    }

    /// Queue an already-owned task
    pub fn enqueue(&self, task: Task) -> Result<()> {
        self.ensure_open()?;
        self.shared.tasks.push(task)?;
        self.shared.stats.add_enqueued(1);
        Ok(())
    }

    /// Schedule an event due at scheduler time `expires_at_ms`. Returns the event id.
    pub fn schedule_event(
        &self,
        kind: EventKind,
        expires_at_ms: i64,
        payload: Option<&[u8]>,
    ) -> Result<String> {
        self.ensure_open()?;
        let payload = payload.map(copy_payload).transpose()?;
        let id = Uuid::new_v4().to_string();
        self.shared
            .events
            .insert(Event::new(id.clone(), kind, expires_at_ms, payload))?;
        self.shared.stats.add_events_scheduled(1);
        Ok(id)
    }

    /// Schedule an event `delay` from now. Returns the event id.
    pub fn schedule_event_in(
        &self,
        kind: EventKind,
        delay: Duration,
        payload: Option<&[u8]>,
    ) -> Result<String> {
        let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
        let expires_at_ms = self.now_ms().saturating_add(delay_ms);
        self.schedule_event(kind, expires_at_ms, payload)
    }

    /// Register a cron job
    pub fn add_cron_job(
        &self,
        id: &str,
        name: &str,
        message: &str,
        schedule: CronSchedule,
    ) -> Result<()> {
        self.ensure_open()?;
        let now = self.now_ms();
        let job = CronJob::new(copy_str(id)?, copy_str(name)?, copy_str(message)?, schedule, now);
        self.shared.cron.add(job, now)?;
        self.shared.events.notify_timer();
        Ok(())
    }

    /// Register a cron job from its persisted definition, honouring `enabled`
    pub fn add_cron_definition(&self, definition: CronJobDefinition) -> Result<()> {
        self.ensure_open()?;
        let now = self.now_ms();
        let mut job = CronJob::new(
            definition.id,
            definition.name,
            definition.message,
            definition.schedule,
            now,
        );
        job.enabled = definition.enabled;
        self.shared.cron.add(job, now)?;
        self.shared.events.notify_timer();
        Ok(())
    }

    /// Remove a cron job. Unknown ids are ignored.
    pub fn remove_cron_job(&self, id: &str) {
        if self.shared.cron.remove(id) {
            self.shared.events.notify_timer();
        }
    }

    /// Enable or disable a cron job
    pub fn set_cron_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        self.ensure_open()?;
        self.shared.cron.set_enabled(id, enabled, self.now_ms())?;
        self.shared.events.notify_timer();
        Ok(())
    }

    /// Snapshot of every cron job, sorted by id
    pub fn cron_jobs(&self) -> Vec<CronJob> {
        self.shared.cron.snapshot()
    }

    /// Snapshot of one cron job
    pub fn cron_job(&self, id: &str) -> Option<CronJob> {
        self.shared.cron.get(id)
    }

    /// Tasks waiting for a worker
    pub fn pending_tasks(&self) -> usize {
        self.shared.tasks.len()
    }

    /// Events waiting for their deadline
    pub fn pending_events(&self) -> usize {
        self.shared.events.len()
    }

    /// Counter snapshot
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        self.shared.shutdown.state()
    }

    /// Current scheduler time in milliseconds
    pub fn now_ms(&self) -> i64 {
        self.shared.clock.now_ms()
    }

    /// Worker count `run` will start
    pub fn worker_count(&self) -> usize {
        self.shared.config.resolved_worker_count()
    }

    /// Whether shutdown has been requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.shared.shutdown.is_requested()
    }

    /// Request cooperative shutdown
    ///
    /// Workers finish their current task and exit; queued tasks and events are
    /// discarded. Callable from any thread, any number of times. Returns whether
    /// this call initiated shutdown.
    pub fn request_shutdown(&self) -> bool {
        self.shared.shutdown.request()
    }

    /// Run one timer pass at the clock's current time
    ///
    /// The timer thread calls this in a loop; tests drive it directly with a
    /// [`ManualClock`](crate::clock::ManualClock).
    pub fn tick(&self) -> TickReport {
        timer::tick(&self.shared)
    }

    /// Start the worker pool and the timer thread and block until shutdown completes
    pub fn run(&self) -> Result<()> {
        self.shared
            .shutdown
            .transition(SchedulerState::Created, SchedulerState::Running)
            .map_err(|actual| Error::InvalidState {
                expected: "created",
                actual,
            })?;

        let config = &self.shared.config;
        let mut pool = WorkerPool::new(
            config.resolved_worker_count(),
            self.shared.tasks.clone(),
            self.shared.task_handler.clone(),
            self.shared.stats.clone(),
        )
        .with_name_prefix(config.thread_name_prefix.clone());

        if self.shared.shutdown.is_requested() {
            info!("Shutdown requested before start, not starting threads");
            self.finish_shutdown(&mut pool);
            return Ok(());
        }

        if !self.shared.task_handler.is_set() {
            warn!("No task handler registered; dequeued tasks will be dropped");
        }

        info!(
            workers = pool.worker_count(),
            poll_interval_ms = config.poll_interval_ms,
            cron_jobs = self.shared.cron.len(),
            "Scheduler starting"
        );

        if let Err(e) = pool.start() {
            error!(error = %e, "Failed to start worker pool");
            self.finish_shutdown(&mut pool);
            return Err(e);
        }

        let shared = self.shared.clone();
        let timer = thread::Builder::new()
            .name(format!("{}-timer", config.thread_name_prefix))
            .spawn(move || timer::run_loop(&shared));

        let timer = match timer {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Failed to start timer thread");
                self.finish_shutdown(&mut pool);
                return Err(Error::Spawn(e));
            }
        };

        let timer_result = timer.join();
        let abnormal = self.finish_shutdown(&mut pool);

        if timer_result.is_err() {
            return Err(Error::Internal("timer thread panicked".to_string()));
        }
        if abnormal > 0 {
            return Err(Error::Internal(format!(
                "{} worker thread(s) terminated abnormally",
                abnormal
            )));
        }
        Ok(())
    }

    /// Release everything still held once the scheduler is stopped (or never ran)
    ///
    /// Discards queued tasks, events and cron jobs and drops both handlers, which
    /// breaks any reference cycle through a handler that captured this scheduler.
    /// Every mutator fails with [`Error::SchedulerClosed`] afterwards.
    pub fn deinit(&self) -> Result<()> {
        let shutdown = &self.shared.shutdown;
        match shutdown.state() {
            SchedulerState::Closed => return Ok(()),
            SchedulerState::Created => {
                // A run() that wins the race keeps its scheduler untouched
                shutdown
                    .transition(SchedulerState::Created, SchedulerState::Closed)
                    .map_err(|actual| Error::InvalidState {
                        expected: "created or stopped",
                        actual,
                    })?;
                shutdown.request();
            }
            SchedulerState::Stopped => {
                shutdown
                    .transition(SchedulerState::Stopped, SchedulerState::Closed)
                    .map_err(|actual| Error::InvalidState {
                        expected: "created or stopped",
                        actual,
                    })?;
            }
            actual => {
                return Err(Error::InvalidState {
                    expected: "created or stopped",
                    actual,
                })
            }
        }

        let (tasks, events) = self.discard_queued();
        let jobs = self.shared.cron.clear();
        self.shared.task_handler.clear();
        self.shared.event_handler.clear();
        debug!(tasks, events, cron_jobs = jobs, "Scheduler released");
        Ok(())
    }

    #[cfg(test)]
    pub(super) fn pop_queued_task(&self) -> Option<Task> {
        self.shared.tasks.try_pop()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shared.shutdown.is_requested() {
            return Err(Error::SchedulerClosed);
        }
        match self.shared.shutdown.state() {
            SchedulerState::Created | SchedulerState::Running => Ok(()),
            _ => Err(Error::SchedulerClosed),
        }
    }

    /// Stop workers, discard queued work and enter `Stopped`
    ///
    /// Returns the number of workers that terminated abnormally.
    fn finish_shutdown(&self, pool: &mut WorkerPool) -> usize {
        let shutdown = &self.shared.shutdown;
        shutdown.request();
        let _ = shutdown.transition(SchedulerState::Running, SchedulerState::ShuttingDown);

        let abnormal = pool.stop();
        let (tasks, events) = self.discard_queued();
        if tasks > 0 || events > 0 {
            info!(tasks, events, "Discarded queued work at shutdown");
        }

        let _ = shutdown.transition(SchedulerState::ShuttingDown, SchedulerState::Stopped);
        info!(stats = ?self.stats(), "Scheduler stopped");
        abnormal
    }

    fn discard_queued(&self) -> (usize, usize) {
        let tasks = self.shared.tasks.drain().len();
        let events = self.shared.events.drain().len();
        self.shared.stats.add_discarded(tasks as u64);
        self.shared.stats.add_events_discarded(events as u64);
        (tasks, events)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state())
            .field("pending_tasks", &self.pending_tasks())
            .field("pending_events", &self.pending_events())
            .field("cron_jobs", &self.shared.cron.len())
            .finish()
    }
}
