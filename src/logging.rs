//! Structured logging through `tracing`
//!
//! Log lines go to `<config dir>/arangocrust.log` and, when enabled, to stderr.
//! `RUST_LOG` overrides the configured level.

use crate::config::{LogLevel, LoggingConfig};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "arangocrust";
const LOG_FILE_SUFFIX: &str = "log";

/// Keeps the background log writer alive; dropping it flushes pending lines
pub struct LogGuard {
    _guard: Option<WorkerGuard>,
}

/// Path of the log file inside `log_dir`
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("{LOG_FILE_PREFIX}.{LOG_FILE_SUFFIX}"))
}

/// Filter used when `RUST_LOG` is not set; HTTP internals stay at warn
fn default_directives(level: LogLevel) -> String {
    format!("{level},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn")
}

fn build_env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig, log_dir: &Path) -> Result<LogGuard, Box<dyn Error>> {
    let (file_layer, guard) = if config.file_output {
        std::fs::create_dir_all(log_dir)?;
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix(LOG_FILE_SUFFIX)
            .build(log_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let console_layer = config.console_output.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(build_env_filter(config.level))
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    tracing::debug!(
        "Logging initialized: dir={}, level={}",
        log_dir.display(),
        config.level
    );

    Ok(LogGuard { _guard: guard })
}
