//! Diagnostic logging.
//!
//! The run UI owns stdout, so diagnostics go to stderr at `warn` by default.
//! `-v` raises that to `debug` for this crate and the runtime; `RUST_LOG`
//! overrides both. With `--log-file` diagnostics are written there as JSON
//! lines instead, through a non-blocking writer.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,ekko=debug,ekko_runtime=debug"
    } else {
        "warn"
    }
}

/// Install the global subscriber. Calling this more than once is harmless.
///
/// Keep the returned guard alive until exit so buffered file output is flushed.
pub fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    if TRACING_INIT.get().is_some() {
        return Ok(None);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let guard = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .json()
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .try_init();
            None
        }
    };

    let _ = TRACING_INIT.set(());
    Ok(guard)
}
