//! Invocation of external configuration-management tools.
//!
//! Two seams keep the router testable without spawning processes:
//!
//! - [`Executor`] turns an [`Invocation`] (mapping target plus generated
//!   arguments) into the tool's raw JSON text. [`ProcessExecutor`] is the
//!   production implementation.
//! - [`CommandRunner`] runs one shell command line and captures stdout.
//!   [`ShellRunner`] is the production implementation and is also used by
//!   the dependency probe.

pub mod command;
mod process;

use camino::Utf8PathBuf;
use serde_json::{Map, Value};
use shim_config::Config;

use crate::error::ShimError;
use crate::mapping::ExternalTarget;

pub use self::process::{ProcessExecutor, ShellRunner};

/// Runs a shell command line and returns its standard output.
///
/// Implementations block until the command exits.
pub trait CommandRunner {
    /// Runs `command` through the shell.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::Spawn`] when the shell cannot be started and
    /// [`ShimError::NonZeroExit`] when the command fails.
    fn run(&self, command: &str) -> Result<String, ShimError>;
}

/// Runs an invocation against its external tool.
///
/// # Example
///
/// ```
/// use shim_engine::error::ShimError;
/// use shim_engine::exec::{Executor, Invocation};
///
/// struct CannedExecutor;
///
/// impl Executor for CannedExecutor {
///     fn execute(&self, _invocation: &Invocation<'_>) -> Result<String, ShimError> {
///         Ok(String::from("{\"changed\": false}"))
///     }
/// }
/// ```
pub trait Executor {
    /// Executes the invocation and returns the tool's JSON output text.
    ///
    /// # Errors
    ///
    /// Returns a [`ShimError`] when the tool cannot be run, fails, or the
    /// arguments do not suit the target's backend.
    fn execute(&self, invocation: &Invocation<'_>) -> Result<String, ShimError>;
}

/// Arguments generated for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arguments {
    /// Space-separated `key=value` text handed to an Ansible module.
    KeyValue(String),
    /// A single Chef resource.
    Resource {
        /// Resource name (for the `user` class, the user name).
        name: String,
        /// Action to run; the helper's default when `None`.
        action: Option<String>,
        /// Resource properties.
        properties: Map<String, Value>,
    },
    /// A complete JSON document piped to the tool.
    Document(Value),
}

impl Arguments {
    /// Returns a short label for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::KeyValue(_) => "key-value",
            Self::Resource { .. } => "resource",
            Self::Document(_) => "document",
        }
    }
}

/// A routed call: which external target to run and with what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    target: &'a ExternalTarget,
    arguments: Arguments,
}

impl<'a> Invocation<'a> {
    /// Creates an invocation.
    #[must_use]
    pub const fn new(target: &'a ExternalTarget, arguments: Arguments) -> Self {
        Self { target, arguments }
    }

    /// Returns the external target.
    #[must_use]
    pub const fn target(&self) -> &'a ExternalTarget {
        self.target
    }

    /// Returns the generated arguments.
    #[must_use]
    pub const fn arguments(&self) -> &Arguments {
        &self.arguments
    }
}

/// Filesystem locations used when building command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    python_environment: Utf8PathBuf,
    scripts_directory: Utf8PathBuf,
    scratch_directory: Utf8PathBuf,
    cloud_init_distro: String,
}

impl ToolPaths {
    /// Takes the tool locations from the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            python_environment: config.python_environment.clone(),
            scripts_directory: config.scripts_directory.clone(),
            scratch_directory: config.scratch_directory.clone(),
            cloud_init_distro: config.cloud_init_distro.clone(),
        }
    }

    /// Overrides the scratch directory.
    #[must_use]
    pub fn with_scratch_directory(mut self, directory: impl Into<Utf8PathBuf>) -> Self {
        self.scratch_directory = directory.into();
        self
    }

    /// Returns the Python virtual environment.
    #[must_use]
    pub fn python_environment(&self) -> &camino::Utf8Path {
        &self.python_environment
    }

    /// Returns the helper script directory.
    #[must_use]
    pub fn scripts_directory(&self) -> &camino::Utf8Path {
        &self.scripts_directory
    }

    /// Returns the scratch directory.
    #[must_use]
    pub fn scratch_directory(&self) -> &camino::Utf8Path {
        &self.scratch_directory
    }

    /// Returns the cloud-init distribution name.
    #[must_use]
    pub const fn cloud_init_distro(&self) -> &str {
        self.cloud_init_distro.as_str()
    }
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
