//! Handlers installed by the `run` command
//!
//! The host does not interpret payloads; tasks are logged and acknowledged. A real
//! deployment swaps in a handler that forwards to its agent loop.

use std::time::Duration;
use taskloom_core::{Event, EventKind, Scheduler, Task, TaskHandler, TaskSource};
use tracing::{debug, info};

/// Logs every task it receives
#[derive(Debug, Default)]
pub struct LoggingTaskHandler;

impl TaskHandler for LoggingTaskHandler {
    fn handle(&self, task: &Task) -> anyhow::Result<()> {
        info!(
            task_id = %task.id,
            source = %task.source,
            bytes = task.data.len(),
            payload = %task.data_lossy(),
            "Task received"
        );
        Ok(())
    }
}

/// Turns each heartbeat event into a `heartbeat` task and schedules the next one
///
/// Holds a scheduler handle, so the scheduler must be `deinit`ed to release it.
pub struct HeartbeatHandler {
    scheduler: Scheduler,
    interval: Duration,
}

impl HeartbeatHandler {
    pub fn new(scheduler: Scheduler, interval: Duration) -> Self {
        Self {
            scheduler,
            interval,
        }
    }

    /// Schedule the next heartbeat event
    pub fn schedule_next(&self) -> taskloom_core::Result<String> {
        self.scheduler
            .schedule_event_in(EventKind::Heartbeat, self.interval, None)
    }
}

impl taskloom_core::EventHandler for HeartbeatHandler {
    fn handle(&self, event: &Event) -> anyhow::Result<()> {
        match event.kind {
            EventKind::Heartbeat => {
                if self.scheduler.is_shutdown_requested() {
                    debug!(event_id = %event.id, "Skipping heartbeat during shutdown");
                    return Ok(());
                }
                self.scheduler
                    .add_task(&event.id, b"heartbeat", TaskSource::Heartbeat)?;
                self.schedule_next()?;
                Ok(())
            }
            EventKind::Shutdown => {
                info!(event_id = %event.id, "Shutdown event received");
                self.scheduler.request_shutdown();
                Ok(())
            }
            kind => {
                debug!(event_id = %event.id, %kind, "Ignoring event");
                Ok(())
            }
        }
    }
}
