//! Taskloom Core - thread-based task, event and cron scheduling
//!
//! This crate provides the scheduling engine behind taskloom:
//! - FIFO task queue drained by a fixed pool of worker threads
//! - Deadline-ordered event queue woken by a dedicated timer thread
//! - Interval and one-shot cron jobs with a stable firing phase
//! - Cooperative shutdown that wakes every blocked thread
//!
//! The scheduler never interprets payloads; callers plug in a [`TaskHandler`] and an
//! optional [`EventHandler`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod cron;
pub mod error;
pub mod event;
pub mod event_queue;
pub mod handler;
pub mod scheduler;
pub mod shutdown;
pub mod task;
pub mod task_queue;
pub mod worker_pool;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use cron::{CronJob, CronJobDefinition, CronSchedule, CronTable, DueJob};
pub use error::{format_error_for_cli, Error, Result, UserFriendlyError};
pub use event::{Event, EventKind};
pub use event_queue::EventQueue;
pub use handler::{EventHandler, HandlerOutcome, HandlerSlot, TaskHandler};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerStats, StatsSnapshot, TickReport};
pub use shutdown::{SchedulerState, ShutdownCoordinator, ShutdownFlag};
pub use task::{Task, TaskSource};
pub use task_queue::TaskQueue;
pub use worker_pool::{default_worker_count, WorkerPool};
