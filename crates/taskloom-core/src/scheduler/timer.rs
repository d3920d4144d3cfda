//! Timer thread
//!
//! One pass ([`tick`]) fires due cron jobs, then pops due events and either turns
//! them into tasks or hands them to the event handler. [`run_loop`] repeats passes,
//! sleeping until the earliest known deadline, until shutdown is requested.

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::engine::Shared;
use crate::cron::DueJob;
use crate::event::{Event, EventKind};
use crate::handler::{run_isolated, HandlerOutcome};
use crate::task::{Task, TaskSource};

/// Shortest sleep between passes; keeps a stuck deadline from spinning the thread
const MIN_SLEEP: Duration = Duration::from_millis(1);

/// Most missed slots one cron job fires in a single pass
pub(crate) const CRON_CATCH_UP_LIMIT: usize = 64;

/// What one timer pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Clock reading the pass ran at
    pub now_ms: i64,
    /// Cron jobs fired
    pub cron_fired: usize,
    /// Events turned into tasks
    pub events_promoted: usize,
    /// Events delivered to the event handler
    pub events_dispatched: usize,
    /// Earliest pending cron or event deadline after the pass
    pub next_deadline_ms: Option<i64>,
}

impl TickReport {
    /// Whether the pass did nothing
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.cron_fired == 0 && self.events_promoted == 0 && self.events_dispatched == 0
    }
}

pub(super) fn run_loop(shared: &Shared) {
    let poll = shared.config.poll_interval();
    info!("Timer started");

    while !shared.shutdown.is_requested() {
        let generation = shared.events.generation();
        let report = tick(shared);
        if shared.shutdown.is_requested() {
            break;
        }

        let sleep = match report.next_deadline_ms {
            Some(deadline) => {
                let remaining = deadline.saturating_sub(shared.clock.now_ms()).max(0);
                Duration::from_millis(remaining as u64).min(poll)
            }
            None => poll,
        };
        shared.events.wait_for(sleep.max(MIN_SLEEP), generation);
    }

    info!("Timer stopped");
}

pub(super) fn tick(shared: &Shared) -> TickReport {
    let now_ms = shared.clock.now_ms();
    let cron_fired = fire_cron(shared, now_ms);

    let mut events_promoted = 0;
    let mut events_dispatched = 0;
    for event in shared.events.pop_due(now_ms) {
        if event.kind.promotes_to_task() {
            if promote(shared, event) {
                events_promoted += 1;
            }
        } else if dispatch(shared, event) {
            events_dispatched += 1;
        }
    }

    let next_deadline_ms = match (shared.cron.next_due(), shared.events.peek_deadline()) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };

    let report = TickReport {
        now_ms,
        cron_fired,
        events_promoted,
        events_dispatched,
        next_deadline_ms,
    };
    if !report.is_idle() {
        debug!(?report, "Timer pass");
    }
    report
}

/// Queue a task for every cron slot due at `now_ms`
///
/// Slots are claimed before they are queued. A job that slept through more than
/// [`CRON_CATCH_UP_LIMIT`] intervals catches up over the following passes.
fn fire_cron(shared: &Shared, now_ms: i64) -> usize {
    let mut fired = 0;
    let mut slots = shared.cron.take_due(now_ms, CRON_CATCH_UP_LIMIT).into_iter();
    while let Some(job) = slots.next() {
        let (id, slot_ms) = (job.id, job.scheduled_ms);
        let task = Task::new(id.clone(), job.message.into_bytes(), TaskSource::Cron);
        if let Err(e) = shared.tasks.push(task) {
            warn!(job_id = %id, error = %e, "Failed to queue cron task, retrying next pass");
            release_unqueued(shared, (id, slot_ms), slots);
            break;
        }
        shared.stats.add_enqueued(1);
        shared.stats.add_cron_triggers(1);
        debug!(job_id = %id, slot_ms, "Cron job fired");
        fired += 1;
    }
    fired
}

/// Give claimed but unqueued slots back to the cron table, earliest slot per job
fn release_unqueued(shared: &Shared, first: (String, i64), rest: impl Iterator<Item = DueJob>) {
    let mut unqueued: HashMap<String, (i64, u64)> = HashMap::new();
    let rest = rest.map(|job| (job.id, job.scheduled_ms));
    for (id, slot_ms) in std::iter::once(first).chain(rest) {
        unqueued.entry(id).and_modify(|(_, count)| *count += 1).or_insert((slot_ms, 1));
    }
    for (id, (slot_ms, count)) in unqueued {
        shared.cron.release(&id, slot_ms, count);
    }
}

fn promote(shared: &Shared, event: Event) -> bool {
    let source = match event.kind {
        EventKind::CronTrigger => TaskSource::Cron,
        _ => TaskSource::Event,
    };
    let event_id = event.id.clone();
    let task = Task::new(event.id, event.payload.unwrap_or_default(), source);

    match shared.tasks.push(task) {
        Ok(()) => {
            shared.stats.add_enqueued(1);
            shared.stats.add_events_promoted(1);
            true
        }
        Err(e) => {
            warn!(event_id = %event_id, error = %e, "Dropping due event, task queue rejected it");
            false
        }
    }
}

fn dispatch(shared: &Shared, event: Event) -> bool {
    let Some(handler) = shared.event_handler.get() else {
        match event.kind {
            EventKind::Shutdown => {
                info!(event_id = %event.id, "Shutdown event fired");
                shared.shutdown.request();
            }
            kind => debug!(event_id = %event.id, %kind, "No event handler, dropping event"),
        }
        return false;
    };

    match run_isolated(|| handler.handle(&event)) {
        HandlerOutcome::Completed => {
            debug!(event_id = %event.id, kind = %event.kind, "Event handled");
        }
        HandlerOutcome::Failed(e) => {
            warn!(event_id = %event.id, kind = %event.kind, error = %e, "Event handler failed");
        }
        HandlerOutcome::Panicked(message) => {
            error!(event_id = %event.id, kind = %event.kind, panic = %message, "Event handler panicked");
        }
    }
    shared.stats.add_events_dispatched(1);
    true
}
