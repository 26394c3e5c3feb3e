//! rbp-retention - resident retention reports from the command line.
//!
//! Loads the exported residents, properties and enrollments tables from a
//! data directory and prints cohort retention, checkpoint churn, the
//! survival curve or segment breakdowns, or writes all of them as JSON for
//! the dashboard.

mod cli;
mod commands;
mod render;

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

/// Environment variable naming a directory for daily rolling log files
const LOG_DIR_ENV: &str = "RBP_LOG_DIR";

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "rbp-retention.log";

/// Initialize the tracing subscriber for logging.
///
/// Returns the file writer guard when file logging is enabled; it must stay
/// alive until exit so buffered lines are flushed.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();
    let cli = Cli::parse();
    debug!(?cli, "Parsed arguments");
    info!("rbp-retention starting");

    commands::run(cli)
}
