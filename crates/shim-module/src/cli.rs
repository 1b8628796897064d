//! Command-line entry point for the `mmi-shim` binary.
//!
//! Flags, `SHIM_*` variables and the configuration file are merged by
//! [`Config::resolve`]; this module only maps the outcome to an exit code.

use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::ExitCode;

use shim_config::{Config, ConfigError};
use thiserror::Error;

use crate::host;
use crate::protocol::ProtocolError;
use crate::telemetry::{self, TelemetryError};

/// Exit code for command-line usage errors.
const USAGE_EXIT_CODE: u8 = 2;

/// Failures that stop the binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Logging could not be initialised.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    /// The host streams failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Resolves configuration from `args`, then serves the host on
/// `reader`/`writer`.
///
/// Usage errors and fatal failures are written to `stderr`.
pub fn run<I, T, R, W, E>(args: I, reader: R, writer: W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    R: BufRead,
    W: Write,
    E: Write,
{
    let config = match Config::resolve(args) {
        Ok(config) => config,
        Err(err) => return report_config_error(&err, stderr),
    };

    match serve_host(&config, reader, writer) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            writeln!(stderr, "mmi-shim: {err}").ok();
            ExitCode::FAILURE
        }
    }
}

fn report_config_error<E: Write>(err: &ConfigError, stderr: &mut E) -> ExitCode {
    let Some((usage, is_failure)) = err.usage() else {
        writeln!(stderr, "mmi-shim: {err}").ok();
        return ExitCode::FAILURE;
    };
    write!(stderr, "{usage}").ok();
    if is_failure {
        ExitCode::from(USAGE_EXIT_CODE)
    } else {
        ExitCode::SUCCESS
    }
}

fn serve_host<R: BufRead, W: Write>(
    config: &Config,
    reader: R,
    writer: W,
) -> Result<usize, CliError> {
    telemetry::initialise(config)?;
    Ok(host::run(config, &config.client_name, reader, writer)?)
}
