//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::worker_pool::default_worker_count;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Worker threads (default: available parallelism, minimum 1)
    #[serde(default)]
    pub worker_count: Option<usize>,
    /// Longest the timer sleeps without a known deadline, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Prefix for thread names
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_thread_name_prefix() -> String {
    "taskloom".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: None,
            poll_interval_ms: default_poll_interval_ms(),
            thread_name_prefix: default_thread_name_prefix(),
        }
    }
}

impl SchedulerConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set worker count
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    /// Set poll interval
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set thread name prefix
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Worker count with the default applied
    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count
            .unwrap_or_else(default_worker_count)
            .max(1)
    }

    /// Poll interval as a duration, never zero
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
