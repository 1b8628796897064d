//! Startup dependency probe.
//!
//! Each backend needs its tool chain installed before any request can be
//! served. [`DependencyProbe::run`] executes an ordered list of shell checks
//! and stops at the first failure; the host adapter keeps the module
//! disabled when the probe fails.

use shim_config::{Backend, Config};
use tracing::{debug, info, warn};

use crate::error::ShimError;
use crate::exec::CommandRunner;
use crate::exec::command::{
    ANSIBLE_EXECUTABLE, PYTHON_EXECUTABLE, RUBY_EXECUTABLE, shell_quote,
};

/// Tracing target for the dependency probe.
const PROBE_TARGET: &str = "shim_engine::probe";

/// Python package providing Ansible.
const ANSIBLE_PACKAGE: &str = "ansible-core";
/// Companion executable installed with Ansible.
const ANSIBLE_GALAXY_EXECUTABLE: &str = "ansible-galaxy";
/// Ruby gem providing Chef Infra.
const CHEF_GEM: &str = "chef";
/// Python package providing cloud-init.
const CLOUD_INIT_PACKAGE: &str = "cloud-init";

/// One named shell check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCheck {
    description: String,
    command: String,
    expected_output: Option<String>,
}

impl DependencyCheck {
    /// Creates a check that passes when `command` exits successfully.
    #[must_use]
    pub fn new(description: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            command: command.into(),
            expected_output: None,
        }
    }

    /// Additionally requires the trimmed output to equal `expected`.
    #[must_use]
    pub fn expecting(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    /// Returns the human-readable description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the command line.
    #[must_use]
    pub const fn command(&self) -> &str {
        self.command.as_str()
    }

    fn run<R: CommandRunner + ?Sized>(&self, runner: &R) -> Result<String, ShimError> {
        let output = runner.run(&self.command)?;
        let trimmed = output.trim();
        match &self.expected_output {
            Some(expected) if trimmed != expected.as_str() => Err(ShimError::InvalidArgument {
                message: format!("expected '{expected}', found '{trimmed}'"),
            }),
            _ => Ok(trimmed.to_owned()),
        }
    }
}

/// Ordered dependency checks for one module.
///
/// # Example
///
/// ```
/// use shim_config::{Backend, Config};
/// use shim_engine::probe::DependencyProbe;
///
/// let probe = DependencyProbe::for_backend(Backend::Chef, &Config::default());
/// assert_eq!(probe.module(), "ChefInfra");
/// assert!(!probe.checks().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyProbe {
    module: String,
    checks: Vec<DependencyCheck>,
}

impl DependencyProbe {
    /// Creates a probe from explicit checks.
    #[must_use]
    pub fn new(module: impl Into<String>, checks: Vec<DependencyCheck>) -> Self {
        Self {
            module: module.into(),
            checks,
        }
    }

    /// Returns the checks required by a backend.
    #[must_use]
    pub fn for_backend(backend: Backend, config: &Config) -> Self {
        let checks = match backend {
            Backend::Ansible => ansible_checks(config),
            Backend::Chef => chef_checks(),
            Backend::CloudInit => cloud_init_checks(),
        };
        Self::new(backend.module_name(), checks)
    }

    /// Returns the module name.
    #[must_use]
    pub const fn module(&self) -> &str {
        self.module.as_str()
    }

    /// Returns the checks in execution order.
    #[must_use]
    pub fn checks(&self) -> &[DependencyCheck] {
        &self.checks
    }

    /// Runs every check in order, stopping at the first failure.
    ///
    /// Check output is logged at info level when `full_logging` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::Dependency`] naming the failing check.
    pub fn run<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        full_logging: bool,
    ) -> Result<(), ShimError> {
        for check in &self.checks {
            debug!(
                target: PROBE_TARGET,
                module = %self.module,
                check = check.description(),
                "running dependency check"
            );
            match check.run(runner) {
                Ok(output) => {
                    if full_logging && !output.is_empty() {
                        info!(
                            target: PROBE_TARGET,
                            module = %self.module,
                            check = check.description(),
                            output = %output,
                            "dependency found"
                        );
                    }
                }
                Err(err) => {
                    warn!(
                        target: PROBE_TARGET,
                        module = %self.module,
                        check = check.description(),
                        error = %err,
                        "dependency check failed"
                    );
                    return Err(ShimError::Dependency {
                        check: check.description().to_owned(),
                        source: Box::new(err),
                    });
                }
            }
        }
        info!(target: PROBE_TARGET, module = %self.module, "all dependencies found");
        Ok(())
    }
}

fn ansible_checks(config: &Config) -> Vec<DependencyCheck> {
    let environment = config.python_environment.as_str();
    let activate = shell_quote(config.python_environment.join("bin").join("activate").as_str());
    let in_environment = |command: &str| format!(". {activate}; {command}");

    vec![
        DependencyCheck::new("python", format!("command -v {PYTHON_EXECUTABLE}")),
        DependencyCheck::new("pip", format!("{PYTHON_EXECUTABLE} -m pip --version")),
        DependencyCheck::new("venv", format!("{PYTHON_EXECUTABLE} -m venv -h")),
        DependencyCheck::new(
            "python environment",
            format!(
                "[ -f {activate} ] || {PYTHON_EXECUTABLE} -m venv {}",
                shell_quote(environment)
            ),
        ),
        DependencyCheck::new(
            ANSIBLE_PACKAGE,
            in_environment(&format!(
                "{PYTHON_EXECUTABLE} -m pip show --quiet {ANSIBLE_PACKAGE} >/dev/null 2>&1 || \
                 {PYTHON_EXECUTABLE} -m pip install --quiet {ANSIBLE_PACKAGE}"
            )),
        ),
        DependencyCheck::new(
            ANSIBLE_EXECUTABLE,
            in_environment(&format!("command -v {ANSIBLE_EXECUTABLE}")),
        ),
        DependencyCheck::new(
            ANSIBLE_GALAXY_EXECUTABLE,
            in_environment(&format!("command -v {ANSIBLE_GALAXY_EXECUTABLE}")),
        ),
        DependencyCheck::new(
            "ansible version",
            in_environment(&format!("{ANSIBLE_EXECUTABLE} --version | head -n 1")),
        ),
    ]
}

fn chef_checks() -> Vec<DependencyCheck> {
    vec![
        DependencyCheck::new("ruby", format!("command -v {RUBY_EXECUTABLE}")),
        DependencyCheck::new("gem", "command -v gem"),
        DependencyCheck::new(
            CHEF_GEM,
            format!("gem list --installed {}", shell_quote(&format!("^{CHEF_GEM}$"))),
        )
        .expecting("true"),
    ]
}

fn cloud_init_checks() -> Vec<DependencyCheck> {
    vec![
        DependencyCheck::new("python", format!("command -v {PYTHON_EXECUTABLE}")),
        DependencyCheck::new("pip", format!("{PYTHON_EXECUTABLE} -m pip --version")),
        DependencyCheck::new(
            CLOUD_INIT_PACKAGE,
            format!("{PYTHON_EXECUTABLE} -m pip show {CLOUD_INIT_PACKAGE}"),
        ),
    ]
}
