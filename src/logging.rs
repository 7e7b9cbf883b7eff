//! Tracing setup for the binary
//!
//! Console output is always on. With `logging.file_logging` enabled a second
//! layer writes to a daily rolling file in the log directory; if that file
//! cannot be opened the application keeps running with console logging only.

use crate::config::LoggingConfig;
use crate::error::{Result, ThermoVisError};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name prefix of the rolling log files
pub const LOG_FILE_PREFIX: &str = "thermovis.log";

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info,thermovis_rs=debug";

/// Daily rolling appender writing into `dir`, which is created if needed
pub fn file_appender(dir: &Path) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
        .map_err(|e| {
            ThermoVisError::Config(format!("Cannot open log directory {}: {}", dir.display(), e))
        })
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer when dropped and must be kept
/// alive for as long as the program logs.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let mut file_problem = None;
    let appender = if config.file_logging {
        match config.resolved_log_dir() {
            Some(dir) => file_appender(&dir)
                .map_err(|e| file_problem = Some(e.to_string()))
                .ok(),
            None => {
                file_problem = Some("no data directory for log files".to_string());
                None
            }
        }
    } else {
        None
    };

    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    // Reported only now that a subscriber exists
    if let Some(problem) = file_problem {
        tracing::warn!("File logging disabled: {}", problem);
    }

    guard
}
