//! Task definitions
//!
//! A [`Task`] is an immediate unit of work. Its payload is an owned copy of the
//! caller's bytes, so the caller may reuse its buffer as soon as `add_task` returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Where a task came from
///
/// The scheduler only attaches a source to the tasks it creates itself; interpreting
/// the tag is left to the task handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskSource {
    /// Telegram long-polling loop
    Telegram,
    /// Discord gateway
    Discord,
    /// Slack events
    Slack,
    /// Promoted cron job or `CronTrigger` event
    Cron,
    /// Health check / heartbeat loop
    Heartbeat,
    /// Promoted custom event
    Event,
    /// Any other producer
    Other(String),
}

impl TaskSource {
    /// Lowercase tag for this source
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Telegram => "telegram",
            Self::Discord => "discord",
            Self::Slack => "slack",
            Self::Cron => "cron",
            Self::Heartbeat => "heartbeat",
            Self::Event => "event",
            Self::Other(tag) => tag,
        }
    }
}

impl fmt::Display for TaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TaskSource {
    fn from(tag: &str) -> Self {
        match tag {
            "telegram" => Self::Telegram,
            "discord" => Self::Discord,
            "slack" => Self::Slack,
            "cron" => Self::Cron,
            "heartbeat" => Self::Heartbeat,
            "event" => Self::Event,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for TaskSource {
    fn from(tag: String) -> Self {
        match Self::from(tag.as_str()) {
            Self::Other(_) => Self::Other(tag),
            known => known,
        }
    }
}

impl From<TaskSource> for String {
    fn from(source: TaskSource) -> Self {
        match source {
            TaskSource::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// An immediate unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Caller-assigned id, used for logging only
    pub id: String,
    /// Opaque payload
    pub data: Vec<u8>,
    /// Producer tag
    pub source: TaskSource,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a task that takes ownership of `data`
    pub fn new(id: impl Into<String>, data: Vec<u8>, source: impl Into<TaskSource>) -> Self {
        Self {
            id: id.into(),
            data,
            source: source.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a task from a borrowed payload, copying it into an owned buffer
    pub fn copied(id: &str, data: &[u8], source: impl Into<TaskSource>) -> Result<Self> {
        Ok(Self::new(copy_str(id)?, copy_payload(data)?, source))
    }

    /// Payload as UTF-8, replacing invalid sequences
    #[must_use]
    pub fn data_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Deep-copy a payload, reporting allocation failure instead of aborting
pub fn copy_payload(data: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(data.len())?;
    buf.extend_from_slice(data);
    Ok(buf)
}

/// Deep-copy a string, reporting allocation failure instead of aborting
pub fn copy_str(s: &str) -> Result<String> {
    let mut buf = String::new();
    buf.try_reserve_exact(s.len())?;
    buf.push_str(s);
    Ok(buf)
}

#[cfg(test)]
mod tests;
