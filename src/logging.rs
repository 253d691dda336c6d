//! Process logging: console plus a daily-rolling file under the configured
//! log directory.
//!
//! There is no cached global initializer; callers construct the logger once
//! and hold the returned guard for the life of the process so the file
//! writer flushes on shutdown.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ReportConfig;
use crate::error::Result;

/// Keeps the non-blocking file writer alive; dropping it flushes the log.
#[derive(Debug)]
pub struct LogGuard {
    _file: WorkerGuard,
}

/// Install the console + rolling-file subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. If a subscriber is
/// already installed (a second harness in the same process), the existing
/// one is reused and the file guard for the extra appender is still
/// returned.
pub fn init(report: &ReportConfig) -> Result<LogGuard> {
    std::fs::create_dir_all(&report.log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&report.log_dir, "uta.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init();

    if result.is_err() {
        tracing::debug!("subscriber already installed, reusing it");
    }

    Ok(LogGuard { _file: file_guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let report = ReportConfig {
            log_dir: dir.path().join("logs"),
            ..ReportConfig::default()
        };

        let _guard = init(&report).unwrap();
        assert!(report.log_dir.is_dir());
    }

    #[test]
    fn second_init_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let report = ReportConfig {
            log_dir: dir.path().join("logs"),
            ..ReportConfig::default()
        };

        let _first = init(&report).unwrap();
        let second = init(&report);
        assert!(second.is_ok());
    }
}
