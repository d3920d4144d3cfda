//! Cron table - named recurring and one-shot schedules
//!
//! Two schedule shapes are supported:
//! - `Every { interval_ms }`: fires at `added + interval`, then every `interval` after
//!   the previous *scheduled* time, so slow ticks never shift the phase
//! - `Once { at_ms }`: fires once at `at_ms`, then stays disabled
//!
//! [`CronTable::due_jobs`] is a read-only scan acknowledged slot by slot with
//! [`CronTable::mark_triggered`]. The scheduler instead claims with
//! [`CronTable::take_due`], which selects and advances jobs under one lock, and hands
//! back slots it could not queue with [`CronTable::release`].

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// When a cron job fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleFields", into = "ScheduleFields")]
pub enum CronSchedule {
    /// Recurring, every `interval_ms` milliseconds
    Every {
        /// Interval between firings
        interval_ms: u64,
    },
    /// One-shot at scheduler time `at_ms`
    Once {
        /// Firing time
        at_ms: i64,
    },
}

impl CronSchedule {
    /// Recurring schedule
    #[must_use]
    pub fn every(interval_ms: u64) -> Self {
        Self::Every { interval_ms }
    }

    /// One-shot schedule
    #[must_use]
    pub fn once(at_ms: i64) -> Self {
        Self::Once { at_ms }
    }

    /// Build a schedule from optional parts, requiring exactly one of them
    pub fn from_parts(every_ms: Option<u64>, at_ms: Option<i64>) -> Result<Self> {
        match (every_ms, at_ms) {
            (Some(interval_ms), None) => Ok(Self::Every { interval_ms }),
            (None, Some(at_ms)) => Ok(Self::Once { at_ms }),
            (Some(_), Some(_)) => Err(Error::InvalidSchedule(
                "both every_ms and at_ms are set".to_string(),
            )),
            (None, None) => Err(Error::InvalidSchedule(
                "one of every_ms or at_ms is required".to_string(),
            )),
        }
    }

    /// Reject schedules that can never fire correctly
    pub fn validate(&self, now_ms: i64) -> Result<()> {
        match *self {
            Self::Every { interval_ms } if interval_ms == 0 || interval_ms > i64::MAX as u64 => {
                Err(Error::InvalidSchedule(format!(
                    "interval must be positive, got {}",
                    interval_ms
                )))
            }
            Self::Once { at_ms } if at_ms <= now_ms => Err(Error::InvalidSchedule(format!(
                "one-shot time {} is not in the future (now {})",
                at_ms, now_ms
            ))),
            _ => Ok(()),
        }
    }

    /// First firing time for a job added at `now_ms`
    #[must_use]
    pub fn first_run(&self, now_ms: i64) -> i64 {
        match *self {
            Self::Every { interval_ms } => now_ms.saturating_add(interval_ms as i64),
            Self::Once { at_ms } => at_ms,
        }
    }
}

/// Serialized form of a schedule: exactly one field must be present
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleFields {
    /// Interval for recurring jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every_ms: Option<u64>,
    /// Firing time for one-shot jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_ms: Option<i64>,
}

impl TryFrom<ScheduleFields> for CronSchedule {
    type Error = Error;

    fn try_from(fields: ScheduleFields) -> Result<Self> {
        Self::from_parts(fields.every_ms, fields.at_ms)
    }
}

impl From<CronSchedule> for ScheduleFields {
    fn from(schedule: CronSchedule) -> Self {
        match schedule {
            CronSchedule::Every { interval_ms } => Self {
                every_ms: Some(interval_ms),
                at_ms: None,
            },
            CronSchedule::Once { at_ms } => Self {
                every_ms: None,
                at_ms: Some(at_ms),
            },
        }
    }
}

/// A named schedule with its message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronJob {
    /// Unique job id
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Payload handed to the task created on each firing
    pub message: String,
    /// Firing rule
    pub schedule: CronSchedule,
    /// Next firing time in scheduler milliseconds
    pub next_run_ms: i64,
    /// Disabled jobs are never promoted
    pub enabled: bool,
    /// Number of times the job has fired
    #[serde(default)]
    pub run_count: u64,
    /// Scheduled time of the most recent firing
    #[serde(default)]
    pub last_run_ms: Option<i64>,
}

impl CronJob {
    /// Create an enabled job whose first firing is computed from `now_ms`
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
        schedule: CronSchedule,
        now_ms: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            message: message.into(),
            schedule,
            next_run_ms: schedule.first_run(now_ms),
            enabled: true,
            run_count: 0,
            last_run_ms: None,
        }
    }

    /// Whether the job should fire at `now_ms`
    #[must_use]
    pub fn is_due(&self, now_ms: i64) -> bool {
        self.enabled && self.next_run_ms <= now_ms
    }

    /// Apply the post-firing transition for the slot scheduled at `trigger_ms`
    fn record_trigger(&mut self, trigger_ms: i64) {
        self.run_count += 1;
        self.last_run_ms = Some(trigger_ms);
        match self.schedule {
            CronSchedule::Every { interval_ms } => {
                self.next_run_ms = trigger_ms.saturating_add(interval_ms as i64);
            }
            CronSchedule::Once { .. } => {
                self.enabled = false;
            }
        }
    }
}

/// Externally persisted job definition (one element of the cron JSON list)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronJobDefinition {
    /// Unique job id
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Task payload
    pub message: String,
    /// Firing rule
    pub schedule: CronSchedule,
    /// Whether the job starts enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl From<&CronJob> for CronJobDefinition {
    fn from(job: &CronJob) -> Self {
        Self {
            id: job.id.clone(),
            name: job.name.clone(),
            message: job.message.clone(),
            schedule: job.schedule,
            enabled: job.enabled,
        }
    }
}

/// A job reported due by [`CronTable::due_jobs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueJob {
    /// Job id
    pub id: String,
    /// Task payload
    pub message: String,
    /// The slot being fired; pass it back to `mark_triggered`
    pub scheduled_ms: i64,
}

/// Thread-safe map of cron jobs keyed by id
#[derive(Debug, Default)]
pub struct CronTable {
    jobs: Mutex<HashMap<String, CronJob>>,
}

impl CronTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job
    ///
    /// Validates the schedule against `now_ms`. The table is unchanged on error.
    pub fn add(&self, job: CronJob, now_ms: i64) -> Result<()> {
        if job.id.is_empty() {
            return Err(Error::InvalidSchedule("job id must not be empty".to_string()));
        }
        if job.enabled {
            job.schedule.validate(now_ms)?;
        } else if let CronSchedule::Every { .. } = job.schedule {
            job.schedule.validate(now_ms)?;
        }

        let mut jobs = self.jobs.lock();
        if jobs.contains_key(&job.id) {
            return Err(Error::DuplicateJob(job.id));
        }
        jobs.try_reserve(1)?;
        info!(job_id = %job.id, name = %job.name, next_run_ms = job.next_run_ms, "Cron job added");
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    /// Remove a job. Unknown ids are ignored.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.jobs.lock().remove(id).is_some();
        if removed {
            info!(job_id = %id, "Cron job removed");
        } else {
            debug!(job_id = %id, "Cron job not found, nothing to remove");
        }
        removed
    }

    /// Enable or disable a job
    ///
    /// Re-enabling a recurring job restarts its phase at `now_ms + interval`; a
    /// one-shot can only be re-enabled while its time is still in the future.
    pub fn set_enabled(&self, id: &str, enabled: bool, now_ms: i64) -> Result<()> {
        let mut jobs = self.jobs.lock();
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| Error::InvalidSchedule(format!("unknown cron job: {}", id)))?;
        if enabled && !job.enabled {
            job.schedule.validate(now_ms)?;
            job.next_run_ms = job.schedule.first_run(now_ms);
        }
        job.enabled = enabled;
        Ok(())
    }

    /// Enabled jobs due at `now_ms`, ordered by scheduled time then id
    #[must_use]
    pub fn due_jobs(&self, now_ms: i64) -> Vec<DueJob> {
        let jobs = self.jobs.lock();
        let mut due: Vec<DueJob> = jobs
            .values()
            .filter(|job| job.is_due(now_ms))
            .map(|job| DueJob {
                id: job.id.clone(),
                message: job.message.clone(),
                scheduled_ms: job.next_run_ms,
            })
            .collect();
        due.sort_by(|a, b| a.scheduled_ms.cmp(&b.scheduled_ms).then_with(|| a.id.cmp(&b.id)));
        due
    }

    /// Acknowledge the firing of `id` for the slot scheduled at `trigger_ms`
    ///
    /// Returns `false` if the job was removed, disabled, or already moved past that
    /// slot since it was reported due.
    pub fn mark_triggered(&self, id: &str, trigger_ms: i64) -> bool {
        let mut jobs = self.jobs.lock();
        match jobs.get_mut(id) {
            Some(job) if job.enabled && job.next_run_ms == trigger_ms => {
                job.record_trigger(trigger_ms);
                debug!(
                    job_id = %id,
                    trigger_ms,
                    next_run_ms = job.next_run_ms,
                    enabled = job.enabled,
                    "Cron job triggered"
                );
                true
            }
            _ => false,
        }
    }

    /// Claim the slots due at `now_ms`, at most `max_slots_per_job` per job
    ///
    /// Selection and the post-firing transition happen under one lock, so two
    /// concurrent callers never claim the same slot and a removed or disabled job
    /// is never returned. Slots past the cap stay due for the next call.
    pub fn take_due(&self, now_ms: i64, max_slots_per_job: usize) -> Vec<DueJob> {
        let mut jobs = self.jobs.lock();
        let mut claimed = Vec::new();
        for job in jobs.values_mut() {
            let mut slots = 0;
            while slots < max_slots_per_job.max(1) && job.is_due(now_ms) {
                let slot_ms = job.next_run_ms;
                claimed.push(DueJob {
                    id: job.id.clone(),
                    message: job.message.clone(),
                    scheduled_ms: slot_ms,
                });
                job.record_trigger(slot_ms);
                slots += 1;
            }
            if slots > 0 {
                debug!(job_id = %job.id, slots, next_run_ms = job.next_run_ms, "Cron slots claimed");
            }
        }
        claimed.sort_by(|a, b| a.scheduled_ms.cmp(&b.scheduled_ms).then_with(|| a.id.cmp(&b.id)));
        claimed
    }

    /// Hand back `unfired` slots of `id` claimed by [`CronTable::take_due`]
    ///
    /// `scheduled_ms` is the earliest slot that was not queued; the job is due there
    /// again. Returns `false` if the job was removed or disabled since the claim.
    pub fn release(&self, id: &str, scheduled_ms: i64, unfired: u64) -> bool {
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.get_mut(id) else {
            return false;
        };
        let claimed_by_us = match job.schedule {
            CronSchedule::Every { .. } => job.enabled && job.next_run_ms > scheduled_ms,
            CronSchedule::Once { .. } => !job.enabled && job.last_run_ms == Some(scheduled_ms),
        };
        if !claimed_by_us || unfired == 0 {
            return false;
        }

        job.run_count = job.run_count.saturating_sub(unfired);
        job.next_run_ms = scheduled_ms;
        job.enabled = true;
        job.last_run_ms = match job.schedule {
            CronSchedule::Every { interval_ms } if job.run_count > 0 => {
                Some(scheduled_ms.saturating_sub(interval_ms as i64))
            }
            _ => None,
        };
        debug!(job_id = %id, scheduled_ms, unfired, "Cron slots released");
        true
    }

    /// Earliest `next_run_ms` among enabled jobs
    #[must_use]
    pub fn next_due(&self) -> Option<i64> {
        self.jobs
            .lock()
            .values()
            .filter(|job| job.enabled)
            .map(|job| job.next_run_ms)
            .min()
    }

    /// Copy of a single job
    #[must_use]
    pub fn get(&self, id: &str) -> Option<CronJob> {
        self.jobs.lock().get(id).cloned()
    }

    /// Copy of every job, sorted by id
    #[must_use]
    pub fn snapshot(&self) -> Vec<CronJob> {
        let mut jobs: Vec<CronJob> = self.jobs.lock().values().cloned().collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }

    /// Number of registered jobs
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Whether the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Remove every job, returning how many there were
    pub fn clear(&self) -> usize {
        let mut jobs = self.jobs.lock();
        let count = jobs.len();
        jobs.clear();
        count
    }
}

#[cfg(test)]
mod tests;
