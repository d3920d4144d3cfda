//! `taskloom run`: scheduler startup and shutdown

use super::config::AppConfig;
use super::handlers::{HeartbeatHandler, LoggingTaskHandler};
use super::{cron_file, loader, logging, signal};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use taskloom_core::{format_error_for_cli, Scheduler};
use tracing::{debug, error, info, warn};

/// Command-line overrides for `run`
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub workers: Option<usize>,
    pub cron_file: Option<PathBuf>,
}

impl RunOptions {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(workers) = self.workers {
            config.scheduler.worker_count = Some(workers);
        }
        if let Some(path) = &self.cron_file {
            config.cron.file = path.clone();
        }
    }
}

/// Run the scheduler until Ctrl+C, SIGTERM or a shutdown event
pub async fn run(options: RunOptions) -> Result<()> {
    let mut config = loader::load_config(options.config.as_deref())?;
    options.apply(&mut config);
    let _log_guard = logging::init(&config.logging)?;

    info!("Starting taskloom v{}", env!("CARGO_PKG_VERSION"));
    if !Path::new(".env").exists() {
        debug!(".env file not found, using configuration files and environment only");
    }

    let scheduler = Scheduler::new(config.scheduler.clone());
    let loaded = hydrate_cron(&scheduler, &config.cron.file)?;
    scheduler.set_task_handler(LoggingTaskHandler);

    if config.heartbeat.enabled {
        let heartbeat = HeartbeatHandler::new(scheduler.clone(), config.heartbeat.interval());
        heartbeat
            .schedule_next()
            .map_err(|e| anyhow!(format_error_for_cli(&e)))?;
        scheduler.set_event_handler(heartbeat);
    }

    info!(
        workers = scheduler.worker_count(),
        cron_jobs = loaded,
        heartbeat = config.heartbeat.enabled,
        cron_file = %config.cron.file.display(),
        "Scheduler configured"
    );

    let signals = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            if let Err(e) = signal::shutdown_on_signal(scheduler.clone()).await {
                error!(error = %e, "Signal handling failed, shutting down");
                scheduler.request_shutdown();
            }
        })
    };

    let runner = scheduler.clone();
    let outcome = tokio::task::spawn_blocking(move || runner.run())
        .await
        .context("Scheduler thread panicked")?;
    signals.abort();

    let saved = cron_file::save(&config.cron.file, &scheduler.cron_jobs());
    let stats = scheduler.stats();
    scheduler
        .deinit()
        .map_err(|e| anyhow!(format_error_for_cli(&e)))?;

    info!(
        tasks_completed = stats.tasks_completed,
        tasks_failed = stats.tasks_failed,
        tasks_discarded = stats.tasks_discarded,
        cron_triggers = stats.cron_triggers,
        "Taskloom stopped"
    );

    outcome.map_err(|e| anyhow!(format_error_for_cli(&e)))?;
    saved
}

/// Register every job in the cron file, skipping ones the scheduler rejects
fn hydrate_cron(scheduler: &Scheduler, path: &Path) -> Result<usize> {
    let mut loaded = 0;
    for definition in cron_file::load(path)? {
        let id = definition.id.clone();
        match scheduler.add_cron_definition(definition) {
            Ok(()) => loaded += 1,
            Err(e) => warn!(job_id = %id, error = %e, "Skipping cron job"),
        }
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use taskloom_core::CronSchedule;

    #[test]
    fn test_options_override_config() {
        let mut config = AppConfig::default();
        let options = RunOptions {
            config: None,
            workers: Some(7),
            cron_file: Some(PathBuf::from("/tmp/jobs.json")),
        };
        options.apply(&mut config);

        assert_eq!(config.scheduler.worker_count, Some(7));
        assert_eq!(config.cron.file, PathBuf::from("/tmp/jobs.json"));
    }

    #[test]
    fn test_hydrate_skips_rejected_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cron.json");
        fs::write(
            &path,
            r#"[
                {"id": "a", "name": "A", "message": "m", "schedule": {"every_ms": 1000}},
                {"id": "a", "name": "A again", "message": "m", "schedule": {"every_ms": 500}},
                {"id": "zero", "name": "Zero", "message": "m", "schedule": {"every_ms": 0}}
            ]"#,
        )
        .unwrap();

        let scheduler = Scheduler::new(Default::default());
        assert_eq!(hydrate_cron(&scheduler, &path).unwrap(), 1);
        assert_eq!(
            scheduler.cron_job("a").unwrap().schedule,
            CronSchedule::every(1000)
        );
    }
}
