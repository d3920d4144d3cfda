//! Taskloom - background task, event and cron scheduler
//!
//! CLI entry point for the Taskloom scheduler.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;

mod cli;
mod server;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    cli::run(cli).await
}
