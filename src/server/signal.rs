//! OS signal handling

use anyhow::{Context, Result};
use taskloom_core::Scheduler;
use tracing::info;

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
pub async fn wait_for_shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to install Ctrl+C handler")
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C signal");
        }
        result = terminate => {
            result?;
            info!("Received SIGTERM signal");
        }
    }
    Ok(())
}

/// Request scheduler shutdown once a signal arrives
pub async fn shutdown_on_signal(scheduler: Scheduler) -> Result<()> {
    wait_for_shutdown_signal().await?;
    if scheduler.request_shutdown() {
        info!("Shutdown requested, waiting for workers to finish current tasks");
    }
    Ok(())
}
