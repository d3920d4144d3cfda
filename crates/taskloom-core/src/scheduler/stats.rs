//! Scheduler counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by the scheduler's threads
#[derive(Debug, Default)]
pub struct SchedulerStats {
    tasks_enqueued: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_discarded: AtomicU64,
    events_scheduled: AtomicU64,
    events_promoted: AtomicU64,
    events_dispatched: AtomicU64,
    events_discarded: AtomicU64,
    cron_triggers: AtomicU64,
}

/// Point-in-time copy of [`SchedulerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Tasks accepted into the task queue
    pub tasks_enqueued: u64,
    /// Handler calls that returned `Ok`
    pub tasks_completed: u64,
    /// Handler calls that errored or panicked, or found no handler
    pub tasks_failed: u64,
    /// Tasks dropped unexecuted at shutdown
    pub tasks_discarded: u64,
    /// Events accepted into the event queue
    pub events_scheduled: u64,
    /// Events turned into tasks
    pub events_promoted: u64,
    /// Events delivered to the event handler
    pub events_dispatched: u64,
    /// Events dropped unfired at shutdown
    pub events_discarded: u64,
    /// Cron firings
    pub cron_triggers: u64,
}

impl StatsSnapshot {
    /// Handler invocations that finished, successfully or not
    #[must_use]
    pub fn tasks_handled(&self) -> u64 {
        self.tasks_completed + self.tasks_failed
    }
}

macro_rules! counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            pub(crate) fn $name(&self, n: u64) {
                self.$field.fetch_add(n, Ordering::Relaxed);
            }
        )*
    };
}

impl SchedulerStats {
    counter! {
        add_enqueued => tasks_enqueued,
        add_completed => tasks_completed,
        add_failed => tasks_failed,
        add_discarded => tasks_discarded,
        add_events_scheduled => events_scheduled,
        add_events_promoted => events_promoted,
        add_events_dispatched => events_dispatched,
        add_events_discarded => events_discarded,
        add_cron_triggers => cron_triggers,
    }

    /// Read every counter
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            tasks_enqueued: self.tasks_enqueued.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            tasks_discarded: self.tasks_discarded.load(Ordering::Relaxed),
            events_scheduled: self.events_scheduled.load(Ordering::Relaxed),
            events_promoted: self.events_promoted.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            events_discarded: self.events_discarded.load(Ordering::Relaxed),
            cron_triggers: self.cron_triggers.load(Ordering::Relaxed),
        }
    }
}
