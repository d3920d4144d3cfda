//! Scheduler
//!
//! Ties the task queue, the event queue, the cron table and the worker pool together:
//!
//! - [`Scheduler`]: public handle, lifecycle and the add/schedule operations
//! - timer thread: fires cron jobs and due events, sleeping until the next deadline
//! - [`SchedulerStats`]: counters shared by every scheduler thread
//!
//! ```text
//! add_task ───────────────────────────────┐
//! schedule_event ─▶ EventQueue ─┐         ▼
//!                               timer ─▶ TaskQueue ─▶ workers ─▶ TaskHandler
//! add_cron_job ──▶ CronTable ───┘   └──▶ EventHandler (shutdown / heartbeat)
//! ```

mod config;
mod engine;
mod stats;
mod timer;

pub use config::SchedulerConfig;
pub use engine::Scheduler;
pub use stats::{SchedulerStats, StatsSnapshot};
pub use timer::TickReport;
