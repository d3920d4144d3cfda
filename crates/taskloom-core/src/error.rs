//! Error types for taskloom-core
//!
//! Only input and resource errors reach callers of the public API. Errors raised by
//! task and event handlers are `anyhow::Error`s that the scheduler logs and absorbs.

use thiserror::Error;

use crate::shutdown::SchedulerState;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// A cron job with the same id is already registered
    #[error("duplicate cron job: {0}")]
    DuplicateJob(String),

    /// Cron schedule is malformed (zero interval, one-shot in the past, ...)
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    /// The scheduler no longer accepts work
    #[error("scheduler is closed")]
    SchedulerClosed,

    /// Operation not allowed in the current lifecycle state
    #[error("invalid scheduler state: expected {expected}, found {actual}")]
    InvalidState {
        /// State the operation requires
        expected: &'static str,
        /// State the scheduler was in
        actual: SchedulerState,
    },

    /// Memory for a queue slot or payload copy could not be reserved
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// An OS thread could not be spawned
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Internal error (a scheduler thread died, ...)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::collections::TryReserveError> for Error {
    fn from(err: std::collections::TryReserveError) -> Self {
        Error::Allocation(err.to_string())
    }
}

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::DuplicateJob(id) => format!("A cron job named '{}' already exists.", id),
            Error::InvalidSchedule(msg) => format!("The cron schedule was rejected: {}", msg),
            Error::SchedulerClosed => "The scheduler is shutting down or stopped.".to_string(),
            Error::InvalidState { expected, actual } => format!(
                "The scheduler is {} but this operation needs it {}.",
                actual, expected
            ),
            Error::Allocation(msg) => format!("Out of memory while queueing work: {}", msg),
            Error::Spawn(e) => format!("Could not start a scheduler thread: {}", e),
            Error::Internal(msg) => format!("Internal scheduler error: {}", msg),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::DuplicateJob(_) => {
                Some("Remove the existing job first or pick a different id.".to_string())
            }
            Error::InvalidSchedule(_) => Some(
                "Set exactly one of `every_ms` (> 0) or `at_ms` (in the future).".to_string(),
            ),
            Error::Spawn(_) => {
                Some("Lower `scheduler.worker_count` or raise the process thread limit.".to_string())
            }
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    if let Some(suggestion) = error.suggestion() {
        output.push_str("\n\n");
        output.push_str(&suggestion);
    }
    output
}
