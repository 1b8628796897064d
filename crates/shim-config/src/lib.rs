//! Shared configuration for the configuration-management shim.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then a
//! configuration file, then `SHIM_*` environment variables, then command
//! line flags. The file is located through `--config-path` or
//! `SHIM_CONFIG_PATH`; a `.json` file uses the same snake_case keys as the
//! flags. Hosts without a file run on defaults.

mod backend;
mod defaults;
mod error;
mod logging;

use std::ffi::OsString;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use backend::Backend;
pub use defaults::{
    DEFAULT_CLIENT_NAME, DEFAULT_CLOUD_INIT_DISTRO, DEFAULT_LOG_FILTER,
    DEFAULT_PYTHON_ENVIRONMENT, DEFAULT_SCRATCH_DIRECTORY, DEFAULT_SCRIPTS_DIRECTORY,
    default_client_name, default_cloud_init_distro, default_log_filter, default_log_format,
    default_python_environment, default_scratch_directory, default_scripts_directory,
};
pub use error::ConfigError;
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration for the shim module and its binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "SHIM")]
pub struct Config {
    /// Enables high-volume payload logging.
    pub full_logging: bool,
    /// `tracing` filter expression.
    pub log_filter: String,
    /// Output format for log lines.
    pub log_format: LogFormat,
    /// Log destination; `None` writes to stderr.
    pub log_file: Option<Utf8PathBuf>,
    /// Tool executing the mapped objects.
    pub backend: Backend,
    /// Python virtual environment used by the Ansible backend.
    pub python_environment: Utf8PathBuf,
    /// Directory containing the helper scripts.
    pub scripts_directory: Utf8PathBuf,
    /// Directory for temporary payload files.
    pub scratch_directory: Utf8PathBuf,
    /// Distribution name passed to cloud-init.
    pub cloud_init_distro: String,
    /// Payload ceiling used when the binary opens its session; 0 is unbounded.
    pub max_payload_bytes: u32,
    /// Client name reported when the binary opens its session.
    pub client_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            full_logging: false,
            log_filter: default_log_filter(),
            log_format: default_log_format(),
            log_file: None,
            backend: Backend::default(),
            python_environment: default_python_environment(),
            scripts_directory: default_scripts_directory(),
            scratch_directory: default_scratch_directory(),
            cloud_init_distro: default_cloud_init_distro(),
            max_payload_bytes: 0,
            client_name: default_client_name(),
        }
    }
}

impl Config {
    /// Resolves configuration from `args` (program name first), the
    /// `SHIM_*` environment and the configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a layer is malformed or the
    /// arguments do not parse.
    pub fn resolve<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::load_from_iter(args).map_err(|source| ConfigError::Load { source })
    }

    /// Returns the configured log filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the configured log file, if any.
    #[must_use]
    pub fn log_file(&self) -> Option<&Utf8Path> {
        self.log_file.as_deref()
    }
}
