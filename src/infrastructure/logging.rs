use std::io;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::{config::LoggingConfig, infrastructure::directories::ResolvedPaths};

const LOG_FILE_PREFIX: &str = "guard.log";

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Console (stderr) plus a daily rolling file. `RUST_LOG` wins over `LOG_LEVEL`.
/// Safe to call more than once; only the first call installs the subscriber.
pub fn init_tracing(logging: &LoggingConfig, paths: &ResolvedPaths) -> Result<()> {
    if FILE_GUARD.get().is_some() {
        return Ok(());
    }

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&paths.logs_dir, LOG_FILE_PREFIX));
    if FILE_GUARD.set(guard).is_err() {
        return Ok(());
    }

    // stdout is reserved for command output
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_ansi(true);
    let file = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(build_filter(&logging.level))
        .with(console)
        .with(file)
        .try_init()?;

    tracing::debug!(target: "lifecycle", logs = %paths.logs_dir.display(), "tracing initialized");
    Ok(())
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
