use anyhow::{anyhow, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name prefix for gate logs
pub const LOG_FILE_NAME: &str = "toolgate.log";

/// Output format for log files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Initialize the logging system
///
/// Logs go to a daily-rotated file in `dir` only (no console output).
/// Fails if a global subscriber is already installed.
pub fn init_logging(dir: impl AsRef<Path>, format: LogFormat) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);

    // Default to INFO level, can be overridden with RUST_LOG env var
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(file_appender)
                    .with_target(true)
                    .with_current_span(false),
            )
            .try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install log subscriber: {}", e))?;

    tracing::info!("Logging system initialized");
    tracing::info!("Log files location: {}", dir.join(LOG_FILE_NAME).display());

    Ok(())
}

/// Check if the log directory exists
pub fn logs_dir_exists(dir: impl AsRef<Path>) -> bool {
    dir.as_ref().exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_dir_and_rejects_second_init() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("logs");
        assert!(!logs_dir_exists(&dir));

        // A global subscriber may already be installed by another test
        let first = init_logging(&dir, LogFormat::Json);
        assert!(logs_dir_exists(&dir));

        if first.is_ok() {
            assert!(init_logging(&dir, LogFormat::Text).is_err());
        }
    }
}
