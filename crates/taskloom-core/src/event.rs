//! Scheduled events

use serde::{Deserialize, Serialize};
use std::fmt;

/// What an event does when it becomes due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Promoted to a task with source `event`
    Custom,
    /// Dispatched to the event handler; requests shutdown if no handler is set
    Shutdown,
    /// Dispatched to the event handler
    Heartbeat,
    /// Promoted to a task with source `cron`
    CronTrigger,
}

impl EventKind {
    /// Whether the timer turns this event into a task rather than dispatching it
    #[must_use]
    pub fn promotes_to_task(self) -> bool {
        matches!(self, Self::Custom | Self::CronTrigger)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom => write!(f, "custom"),
            Self::Shutdown => write!(f, "shutdown"),
            Self::Heartbeat => write!(f, "heartbeat"),
            Self::CronTrigger => write!(f, "cron_trigger"),
        }
    }
}

/// A unit of work due at a future monotonic time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event id
    pub id: String,
    /// Event kind
    pub kind: EventKind,
    /// Optional owned payload, moved into the task on promotion
    pub payload: Option<Vec<u8>>,
    /// Due time in scheduler clock milliseconds
    pub expires_at_ms: i64,
}

impl Event {
    /// Create an event
    pub fn new(
        id: impl Into<String>,
        kind: EventKind,
        expires_at_ms: i64,
        payload: Option<Vec<u8>>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
            expires_at_ms,
        }
    }

    /// Whether the event is due at `now_ms`
    #[must_use]
    pub fn is_due(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }
}
