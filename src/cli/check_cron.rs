//! `taskloom check-cron`

use anyhow::{bail, Result};
use std::path::Path;
use taskloom_core::{format_error_for_cli, CronJob, CronJobDefinition, CronSchedule, CronTable};

use crate::server::cron_file;

/// Outcome of checking one definition
#[derive(Debug)]
pub struct CheckedJob {
    pub id: String,
    pub line: String,
    pub ok: bool,
}

/// Validate every job in `path` as a freshly started scheduler would load it
pub fn check(path: &Path) -> Result<Vec<CheckedJob>> {
    let table = CronTable::new();
    let checked = cron_file::load(path)?
        .into_iter()
        .map(|definition| check_one(&table, definition))
        .collect();
    Ok(checked)
}

fn check_one(table: &CronTable, definition: CronJobDefinition) -> CheckedJob {
    let id = definition.id.clone();
    let summary = format!(
        "{:<20} {:<28} {}{}",
        definition.id,
        definition.name,
        describe(&definition.schedule),
        if definition.enabled { "" } else { " (disabled)" }
    );

    let mut job = CronJob::new(
        definition.id,
        definition.name,
        definition.message,
        definition.schedule,
        0,
    );
    job.enabled = definition.enabled;

    match table.add(job, 0) {
        Ok(()) => CheckedJob {
            id,
            line: format!("  ✓ {}", summary),
            ok: true,
        },
        Err(e) => CheckedJob {
            id,
            line: format!("  ✗ {}\n      {}", summary, format_error_for_cli(&e).replace('\n', "\n      ")),
            ok: false,
        },
    }
}

fn describe(schedule: &CronSchedule) -> String {
    match schedule {
        CronSchedule::Every { interval_ms } => format!("every {}ms", interval_ms),
        CronSchedule::Once { at_ms } => format!("once at {}ms", at_ms),
    }
}

/// Print the check results; fails if any job is invalid
pub fn run(path: &Path) -> Result<()> {
    crate::server::init_default_logging();

    let checked = check(path)?;
    println!("{} ({} jobs)", path.display(), checked.len());
    for job in &checked {
        println!("{}", job.line);
    }

    let invalid: Vec<&str> = checked
        .iter()
        .filter(|job| !job.ok)
        .map(|job| job.id.as_str())
        .collect();
    if !invalid.is_empty() {
        bail!("{} invalid cron job(s): {}", invalid.len(), invalid.join(", "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_check_reports_each_job() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cron.json");
        fs::write(
            &path,
            r#"[
                {"id": "ok", "name": "Ok", "message": "m", "schedule": {"every_ms": 1000}},
                {"id": "ok", "name": "Duplicate", "message": "m", "schedule": {"every_ms": 1000}},
                {"id": "past", "name": "Past", "message": "m", "schedule": {"at_ms": 0}},
                {"id": "done", "name": "Done", "message": "m", "schedule": {"at_ms": 0}, "enabled": false}
            ]"#,
        )
        .unwrap();

        let checked = check(&path).unwrap();
        let flags: Vec<bool> = checked.iter().map(|job| job.ok).collect();
        assert_eq!(flags, vec![true, false, false, true]);
        assert!(checked[0].line.contains("every 1000ms"));
        assert!(checked[3].line.contains("(disabled)"));
    }

    #[test]
    fn test_run_fails_on_invalid_job() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cron.json");
        fs::write(
            &path,
            r#"[{"id": "zero", "name": "Zero", "message": "m", "schedule": {"every_ms": 0}}]"#,
        )
        .unwrap();

        assert!(run(&path).is_err());
    }

    #[test]
    fn test_missing_file_has_no_jobs() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&dir.path().join("absent.json")).is_ok());
    }
}
