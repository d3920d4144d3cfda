//! Host runtime for the Taskloom scheduler
//!
//! # Module Structure
//!
//! - `config`: Configuration structures
//! - `loader`: Configuration loading from files and environment
//! - `logging`: Tracing subscriber setup
//! - `cron_file`: Cron job persistence
//! - `handlers`: Task and event handlers installed by `run`
//! - `signal`: Ctrl+C / SIGTERM handling
//! - `init`: Scheduler startup and shutdown

pub mod config;
pub mod cron_file;
mod handlers;
mod init;
mod loader;
mod logging;
mod signal;

// Re-export public API
pub use init::{run, RunOptions};
pub use logging::init_default as init_default_logging;
