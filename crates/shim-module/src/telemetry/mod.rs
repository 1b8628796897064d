//! Structured telemetry initialisation for the shim module.
//!
//! Logs go to stderr unless a log file is configured. A log file larger
//! than [`MAX_LOG_FILE_BYTES`] is rolled to `<file>.bak` when it is opened,
//! replacing any earlier backup.

use std::fs::{self, File, OpenOptions};
use std::io::{self, IsTerminal};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use shim_config::{Config, LogFormat};

/// Size above which an existing log file is rolled on open.
pub const MAX_LOG_FILE_BYTES: u64 = 1024 * 1024;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to roll or open the configured log file.
    #[error("failed to prepare log file {path}: {source}")]
    LogFile {
        /// Log file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: only the first successful invocation
/// installs the global subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid, the log file
/// cannot be opened, or another subscriber is already installed.
///
/// # Examples
///
/// ```rust
/// use shim_config::Config;
/// use shim_module::telemetry;
///
/// # fn main() -> Result<(), shim_module::telemetry::TelemetryError> {
/// let config = Config::default();
/// let first = telemetry::initialise(&config)?;
/// let second = telemetry::initialise(&config)?;
/// drop(first);
/// drop(second);
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

/// Opens `path` for appending, first rolling it to `<path>.bak` when it
/// exceeds [`MAX_LOG_FILE_BYTES`].
///
/// # Errors
///
/// Returns [`TelemetryError::LogFile`] when the roll or the open fails.
pub fn open_log_file(path: &Utf8Path) -> Result<File, TelemetryError> {
    let log_file_error = |source: io::Error| TelemetryError::LogFile {
        path: path.to_path_buf(),
        source: Arc::new(source),
    };

    if fs::metadata(path).is_ok_and(|metadata| metadata.len() > MAX_LOG_FILE_BYTES) {
        fs::rename(path, backup_path(path)).map_err(log_file_error)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(log_file_error)
}

/// Returns the path a rolled log file is moved to.
#[must_use]
pub fn backup_path(path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{path}.bak"))
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let (writer, ansi) = match config.log_file() {
        Some(path) => (BoxMakeWriter::new(Mutex::new(open_log_file(path)?)), false),
        None => (BoxMakeWriter::new(io::stderr), io::stderr().is_terminal()),
    };

    let builder = |filter: EnvFilter, writer: BoxMakeWriter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(writer)
            // Colour only on interactive terminals; never in log files.
            .with_ansi(ansi)
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter, writer).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter, writer).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
