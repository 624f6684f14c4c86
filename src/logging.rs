//! tracing subscriber setup.
//!
//! Events are appended, without ANSI colors, to `<log_dir>/running_logs.log`
//! and, unless the command writes data to stdout itself, echoed to stdout.
//! `RUST_LOG` overrides the default filter.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_FILE_NAME: &str = "running_logs.log";

/// Default filter: this crate at `info` (or `debug` when verbose), everything
/// else at `warn`.
pub fn default_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("mlpipe={},warn", level)
}

/// Install the global subscriber. Returns the log file path.
pub fn init(log_dir: &Path, verbose: bool, console: bool) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let log_path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(console.then(|| fmt::layer().with_target(false)))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        assert_eq!(default_filter(false), "mlpipe=info,warn");
        assert_eq!(default_filter(true), "mlpipe=debug,warn");
    }
}
