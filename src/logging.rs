//! Tracing configuration and log routing.
//!
//! Logs go to stderr using a compact formatter so stdout stays reserved for the summary itself.
//! When `RUSTY_SUM_LOG_FILE` is set, logs are additionally appended to that path through a
//! non‑blocking writer.
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Configure tracing subscribers for stderr and optional file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stderr layer and, when requested, a file layer.
/// - Returns the file writer's guard; buffered lines are flushed when it is dropped, so hold it
///   until the process is about to exit.
#[must_use = "dropping the guard stops file logging"]
pub fn init_tracing() -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer);

    if let Some((writer, guard)) = configure_file_writer() {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
        Some(guard)
    } else {
        registry.init();
        None
    }
}

/// Build a non‑blocking writer for file logging.
///
/// Returns `None` when no log file was requested or the target file cannot be opened.
fn configure_file_writer() -> Option<(NonBlocking, WorkerGuard)> {
    let path = std::env::var("RUSTY_SUM_LOG_FILE")
        .ok()
        .filter(|value| !value.trim().is_empty())?;
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    {
        Ok(file) => {
            Some(tracing_appender::non_blocking(file))
        }
        Err(err) => {
            eprintln!("Failed to open log file {path}: {err}");
            None
        }
    }
}
