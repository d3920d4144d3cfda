//! Cron job persistence
//!
//! Jobs live in a JSON array of [`CronJobDefinition`]:
//!
//! ```json
//! [{"id": "daily", "name": "Daily report", "message": "send report",
//!   "schedule": {"every_ms": 86400000}, "enabled": true}]
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use taskloom_core::{CronJob, CronJobDefinition};
use tracing::{debug, info};

/// Read job definitions. A missing file is an empty list.
pub fn load(path: &Path) -> Result<Vec<CronJobDefinition>> {
    if !path.exists() {
        debug!(path = %path.display(), "Cron file not found, starting with no jobs");
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read cron file {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let definitions: Vec<CronJobDefinition> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse cron file {}", path.display()))?;
    info!(path = %path.display(), jobs = definitions.len(), "Loaded cron jobs");
    Ok(definitions)
}

/// Write the current jobs back, replacing the file atomically
pub fn save(path: &Path, jobs: &[CronJob]) -> Result<()> {
    let definitions: Vec<CronJobDefinition> = jobs.iter().map(CronJobDefinition::from).collect();
    let content =
        serde_json::to_string_pretty(&definitions).context("Failed to serialize cron jobs")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("Failed to create cron file directory")?;
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).context("Failed to write cron file")?;
    fs::rename(&tmp, path).context("Failed to replace cron file")?;
    info!(path = %path.display(), jobs = definitions.len(), "Saved cron jobs");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskloom_core::CronSchedule;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("cron.json")).unwrap().is_empty());
    }

    #[test]
    fn test_load_parses_both_schedule_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cron.json");
        fs::write(
            &path,
            r#"[
                {"id": "every", "name": "Every", "message": "tick", "schedule": {"every_ms": 1000}},
                {"id": "once", "name": "Once", "message": "ping", "schedule": {"at_ms": 5000}, "enabled": false}
            ]"#,
        )
        .unwrap();

        let jobs = load(&path).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].schedule, CronSchedule::every(1000));
        assert!(jobs[0].enabled);
        assert_eq!(jobs[1].schedule, CronSchedule::once(5000));
        assert!(!jobs[1].enabled);
    }

    #[test]
    fn test_load_rejects_ambiguous_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cron.json");
        fs::write(
            &path,
            r#"[{"id": "x", "name": "X", "message": "m", "schedule": {"every_ms": 1, "at_ms": 2}}]"#,
        )
        .unwrap();

        assert!(load(&path).is_err());
    }

    #[test]
    fn test_save_then_load_keeps_disabled_one_shot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cron.json");

        let mut fired = CronJob::new("once", "Once", "ping", CronSchedule::once(100), 0);
        fired.enabled = false;
        let daily = CronJob::new("daily", "Daily", "report", CronSchedule::every(86_400_000), 0);
        save(&path, &[daily, fired]).unwrap();

        let jobs = load(&path).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, "daily");
        assert!(jobs[0].enabled);
        assert_eq!(jobs[1].id, "once");
        assert!(!jobs[1].enabled);
    }
}
