//! Host configuration types
//!
//! Contains the configuration structures the `taskloom` binary loads.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use taskloom_core::SchedulerConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub cron: CronFileConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where cron job definitions are persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronFileConfig {
    #[serde(default = "default_cron_file")]
    pub file: PathBuf,
}

fn default_cron_file() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("taskloom").join("cron.json"))
        .unwrap_or_else(|| PathBuf::from("data/cron.json"))
}

impl Default for CronFileConfig {
    fn default() -> Self {
        Self {
            file: default_cron_file(),
        }
    }
}

/// Periodic heartbeat events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_heartbeat_interval")]
    pub interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_heartbeat_interval() -> u64 {
    60
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_heartbeat_interval(),
        }
    }
}

impl HeartbeatConfig {
    /// Interval between heartbeats, never zero
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Log output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
    /// Also write logs to a daily-rolling file at this path
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert!(config.heartbeat.enabled);
        assert_eq!(config.heartbeat.interval_secs, 60);
        assert!(!config.logging.json);
        assert!(config.logging.file.is_none());
        assert_eq!(config.scheduler.poll_interval_ms, 1000);
        assert!(config.cron.file.ends_with("cron.json"));
    }

    #[test]
    fn test_heartbeat_interval_never_zero() {
        let config = HeartbeatConfig {
            enabled: true,
            interval_secs: 0,
        };
        assert_eq!(config.interval(), Duration::from_secs(1));
    }
}
