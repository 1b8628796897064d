//! Process-based execution of external tools.
//!
//! [`ShellRunner`] runs a command line through `sh -c` and captures its
//! stdout. [`ProcessExecutor`] builds the backend-specific command line for
//! an [`Invocation`], writing any JSON document to a unique scratch file
//! first, and hands it to a [`CommandRunner`].

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use camino::Utf8Path;
use serde_json::Value;
use shim_config::Backend;
use tempfile::NamedTempFile;
use tracing::debug;

use super::command::{
    ansible_command, chef_command, chef_document, cloud_init_command, strip_ansible_prefix,
};
use super::{Arguments, CommandRunner, Executor, Invocation, ToolPaths};
use crate::error::ShimError;

/// Tracing target for process execution.
const EXEC_TARGET: &str = "shim_engine::exec";

/// Shell used to interpret command lines.
const SHELL: &str = "sh";

/// Runs commands through `sh -c`, blocking until they exit.
///
/// Stdin is closed; stderr is captured and logged at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> Result<String, ShimError> {
        let output = Command::new(SHELL)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| ShimError::Spawn {
                command: command.to_owned(),
                source: Arc::new(err),
            })?;

        if !output.stderr.is_empty() {
            debug!(
                target: EXEC_TARGET,
                stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                "command wrote to stderr"
            );
        }

        if !output.status.success() {
            return Err(ShimError::NonZeroExit {
                command: command.to_owned(),
                status: output.status.code().unwrap_or(-1),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Executes invocations by running the backend's tool as a child process.
///
/// # Example
///
/// ```rust,no_run
/// use shim_config::{Backend, Config};
/// use shim_engine::exec::{
///     Arguments, Executor, Invocation, ProcessExecutor, ShellRunner, ToolPaths,
/// };
/// use shim_engine::mapping::ExternalTarget;
///
/// let executor = ProcessExecutor::new(ShellRunner, ToolPaths::from_config(&Config::default()));
/// let target = ExternalTarget::new(Backend::Ansible, "ansible.builtin", "service_facts");
/// let invocation = Invocation::new(&target, Arguments::KeyValue(String::new()));
/// let output = executor.execute(&invocation);
/// ```
#[derive(Debug, Clone)]
pub struct ProcessExecutor<R = ShellRunner> {
    runner: R,
    paths: ToolPaths,
    full_logging: bool,
}

impl<R> ProcessExecutor<R> {
    /// Creates an executor with payload logging disabled.
    #[must_use]
    pub const fn new(runner: R, paths: ToolPaths) -> Self {
        Self {
            runner,
            paths,
            full_logging: false,
        }
    }

    /// Enables or disables logging of full command lines.
    #[must_use]
    pub const fn with_full_logging(mut self, full_logging: bool) -> Self {
        self.full_logging = full_logging;
        self
    }

    /// Returns the command runner.
    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Returns the tool locations.
    #[must_use]
    pub const fn paths(&self) -> &ToolPaths {
        &self.paths
    }
}

impl<R: CommandRunner> ProcessExecutor<R> {
    fn run_logged(&self, module: &str, command: &str) -> Result<String, ShimError> {
        if self.full_logging {
            debug!(target: EXEC_TARGET, module, command, "running external tool");
        } else {
            debug!(target: EXEC_TARGET, module, "running external tool");
        }
        self.runner.run(command)
    }

    fn run_with_document(
        &self,
        invocation: &Invocation<'_>,
        document: &Value,
    ) -> Result<String, ShimError> {
        let target = invocation.target();
        let scratch = write_scratch(self.paths.scratch_directory(), document)?;
        let command = match target.backend() {
            Backend::Chef => chef_command(self.paths.scripts_directory(), scratch.path()),
            Backend::CloudInit => cloud_init_command(
                self.paths.scripts_directory(),
                self.paths.cloud_init_distro(),
                target,
                scratch.path(),
            ),
            Backend::Ansible => {
                return Err(mismatched_arguments(invocation));
            }
        };
        // The scratch file is removed when `scratch` drops after the run.
        let output = self.run_logged(&target.qualified_module(), &command)?;
        Ok(output.trim().to_owned())
    }
}

impl<R: CommandRunner> Executor for ProcessExecutor<R> {
    fn execute(&self, invocation: &Invocation<'_>) -> Result<String, ShimError> {
        let target = invocation.target();
        match (target.backend(), invocation.arguments()) {
            (Backend::Ansible, Arguments::KeyValue(arguments)) => {
                let command =
                    ansible_command(self.paths.python_environment(), target, arguments);
                let output = self.run_logged(&target.qualified_module(), &command)?;
                Ok(strip_ansible_prefix(&output).to_owned())
            }
            (
                Backend::Chef,
                Arguments::Resource {
                    name,
                    action,
                    properties,
                },
            ) => {
                let document = chef_document(target, name, action.as_deref(), properties);
                self.run_with_document(invocation, &document)
            }
            (Backend::CloudInit, Arguments::Document(document)) => {
                self.run_with_document(invocation, document)
            }
            _ => Err(mismatched_arguments(invocation)),
        }
    }
}

fn mismatched_arguments(invocation: &Invocation<'_>) -> ShimError {
    ShimError::InvalidArgument {
        message: format!(
            "{} target '{}' cannot take {} arguments",
            invocation.target().backend(),
            invocation.target().qualified_module(),
            invocation.arguments().kind(),
        ),
    }
}

/// Writes `document` to a fresh, uniquely named file in `directory`.
fn write_scratch(directory: &Utf8Path, document: &Value) -> Result<NamedTempFile, ShimError> {
    let mut file = tempfile::Builder::new()
        .prefix("shim-payload-")
        .suffix(".json")
        .tempfile_in(directory)
        .map_err(|err| scratch_error(directory, err))?;
    serde_json::to_writer(&mut file, document).map_err(ShimError::SerializePayload)?;
    file.flush().map_err(|err| scratch_error(directory, err))?;
    Ok(file)
}

fn scratch_error(directory: &Utf8Path, err: std::io::Error) -> ShimError {
    ShimError::ScratchFile {
        directory: directory.as_std_path().to_path_buf(),
        source: Arc::new(err),
    }
}
