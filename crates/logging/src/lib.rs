//! This crate provides logging initialization for the docgraph binary.
//!
//! It supports two modes:
//! - CLI mode: logs to STDOUT.
//! - File mode: logs JSON lines to a rolling file and warnings to STDERR, so
//!   STDOUT only carries progress output.
//!
//! File logs are rolled over when they reach 5 MB. Rotated logs are
//! compressed. The maximum number of rotated logs is 20.

use anyhow::{Context, Result};
use file_rotate::{ContentLimit, FileRotate, compression::Compression, suffix::AppendCount};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt::writer::MakeWriterExt};

pub const LOG_FILE_NAME: &str = "docgraph.log";

pub enum LogMode {
    Cli,
    File { log_dir: PathBuf },
}

/// Guard that keeps background logging workers alive.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

/// `~/.docgraph/logs`
pub fn default_log_directory() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine the home directory")?;
    Ok(home.join(".docgraph").join("logs"))
}

pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

pub fn init(mode: LogMode, verbose: bool) -> Result<Option<LoggingGuards>> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    match mode {
        LogMode::Cli => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .init();
            Ok(None)
        }
        LogMode::File { log_dir } => {
            std::fs::create_dir_all(&log_dir).with_context(|| {
                format!("Failed to create log directory: {}", log_dir.display())
            })?;

            let writer = FileRotate::new(
                log_file_path(&log_dir),
                AppendCount::new(20),
                ContentLimit::Bytes(5 * 1024 * 1024),
                Compression::OnRotate(1),
                None,
            );

            let (file_non_blocking, file_guard) = tracing_appender::non_blocking(writer);
            // Bound the stderr buffer and drop what overflows so an unread
            // stderr cannot stall indexing.
            let (stderr_non_blocking, stderr_guard) = NonBlockingBuilder::default()
                .lossy(true)
                .buffered_lines_limit(10_000)
                .finish(std::io::stderr());

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(
                    file_non_blocking.and(stderr_non_blocking.with_max_level(tracing::Level::WARN)),
                )
                .with_ansi(false)
                .json()
                .init();

            Ok(Some(LoggingGuards {
                _guards: vec![file_guard, stderr_guard],
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_lives_in_log_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        assert_eq!(
            log_file_path(temp_dir.path()),
            temp_dir.path().join("docgraph.log")
        );
    }

    #[test]
    fn test_default_log_directory_is_under_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                default_log_directory().unwrap(),
                home.join(".docgraph").join("logs")
            );
        }
    }
}
