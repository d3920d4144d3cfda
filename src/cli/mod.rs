//! CLI module for Taskloom
//!
//! Provides commands:
//! - `run`: Start the scheduler and block until shutdown
//! - `check-cron`: Validate a cron file without starting anything

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::server::RunOptions;

pub mod check_cron;

/// Taskloom scheduler CLI
#[derive(Parser, Debug)]
#[command(name = "taskloom")]
#[command(about = "Background task, event and cron scheduler")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the scheduler
    Run {
        /// Extra configuration file, layered over config/*.toml
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// Number of worker threads
        #[arg(long, short)]
        workers: Option<usize>,
        /// Cron job file (JSON)
        #[arg(long)]
        cron_file: Option<PathBuf>,
    },
    /// Validate a cron file
    CheckCron {
        /// Path to the cron file
        path: PathBuf,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Run {
            config,
            workers,
            cron_file,
        }) => {
            crate::server::run(RunOptions {
                config,
                workers,
                cron_file,
            })
            .await
        }
        Some(Commands::CheckCron { path }) => check_cron::run(&path),
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
