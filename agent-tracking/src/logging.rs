//! Logging for hosts that embed agent-tracking
//!
//! The library itself only emits `tracing` events: sessions started and
//! ended at info, individual writes at debug, schema setup at info. A host
//! that has no subscriber of its own can call [`init`] to send them to a
//! daily-rotated file, by default under `~/.local/state/agent-tracking/`.

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Base name of the log file; the appender adds a date suffix.
pub const LOG_FILE_NAME: &str = "agent-tracking.log";

/// Install a file subscriber as the global default.
///
/// `RUST_LOG` takes precedence over `config.level`. Fails with
/// [`Error::Config`] if the host already installed a subscriber. Keep the
/// returned guard alive for as long as events should reach the file.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let (subscriber, guard) = file_subscriber(config)?;

    subscriber
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {}", e)))?;

    tracing::info!(
        log_dir = %config.log_dir().display(),
        level = %config.level,
        "Logging initialized"
    );
    Ok(guard)
}

/// Build the file subscriber without installing it.
///
/// Creates the log directory if needed.
pub fn file_subscriber(
    config: &LoggingConfig,
) -> Result<(impl Subscriber + Send + Sync + 'static, LoggingGuard)> {
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true),
    );

    Ok((subscriber, LoggingGuard { _guard: guard }))
}

/// Initialize logging for tests (captured by the test harness)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Flushes pending log lines when dropped.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Path of the current log file's base name for a given configuration.
pub fn log_file_path(config: &LoggingConfig) -> PathBuf {
    config.log_dir().join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging_in(dir: PathBuf) -> LoggingConfig {
        LoggingConfig {
            level: "debug".to_string(),
            dir: Some(dir),
        }
    }

    #[test]
    fn test_log_file_path_follows_config() {
        let config = logging_in(PathBuf::from("/tmp/agents"));
        assert_eq!(
            log_file_path(&config),
            PathBuf::from("/tmp/agents/agent-tracking.log")
        );
        assert!(log_file_path(&LoggingConfig::default())
            .ends_with("agent-tracking/agent-tracking.log"));
    }

    #[test]
    fn test_file_subscriber_writes_to_configured_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("logs");
        let config = logging_in(dir.clone());

        let (subscriber, guard) = file_subscriber(&config).unwrap();
        assert!(dir.is_dir());

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(session_id = "s-1", "tracker write failed");
        });
        drop(guard);

        let files: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(LOG_FILE_NAME));

        let contents = std::fs::read_to_string(&files[0]).unwrap();
        assert!(contents.contains("tracker write failed"));
        assert!(contents.contains("s-1"));
    }

    #[test]
    fn test_init_test_is_repeatable() {
        init_test();
        init_test();
    }
}
