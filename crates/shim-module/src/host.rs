//! Module lifecycle driven by a host on a pair of streams.

use std::io::{BufRead, Write};

use shim_config::Config;
use shim_engine::exec::{ProcessExecutor, ShellRunner, ToolPaths};
use shim_engine::{CommandRunner, DependencyProbe, MappingTable, Router};
use tracing::{info, warn};

use crate::context::ModuleContext;
use crate::info::ModuleInfo;
use crate::protocol::{ProtocolError, serve};

/// Tracing target for the module lifecycle.
const HOST_TARGET: &str = "shim_module::host";

/// Builds a context for the configured backend around `runner`.
///
/// Repeated mapping keys and invalid entries are logged; lookups still
/// resolve to the first matching entry.
#[must_use]
pub fn build_context<R: CommandRunner>(
    config: &Config,
    runner: R,
) -> ModuleContext<ProcessExecutor<R>> {
    let table = MappingTable::builtin(config.backend);
    for key in table.duplicate_keys() {
        warn!(target: HOST_TARGET, %key, "duplicate mapping key; the first entry wins");
    }
    if let Err(err) = table.validate() {
        warn!(target: HOST_TARGET, error = %err, "mapping table has invalid entries");
    }
    let info = ModuleInfo::for_table(config.backend, &table);
    let executor = ProcessExecutor::new(runner, ToolPaths::from_config(config))
        .with_full_logging(config.full_logging);
    let router = Router::new(table, executor).with_full_logging(config.full_logging);
    ModuleContext::new(info, router).with_full_logging(config.full_logging)
}

/// Runs one host connection: probe dependencies, open a session, answer
/// requests until end of input, then close and shut down.
///
/// A failed probe leaves the module disabled; requests are still answered,
/// with permission-denied responses.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the streams fail.
pub fn run_with_runner<R, I, O>(
    config: &Config,
    client_name: &str,
    runner: R,
    reader: I,
    writer: O,
) -> Result<usize, ProtocolError>
where
    R: CommandRunner,
    I: BufRead,
    O: Write,
{
    let context = build_context(config, runner);
    let probe = DependencyProbe::for_backend(config.backend, config);
    let enabled = context.initialise(&probe, context.router().executor().runner());
    info!(
        target: HOST_TARGET,
        module = %context.info().name,
        enabled,
        "module loaded"
    );

    let session = context.open(client_name, config.max_payload_bytes);
    let served = serve(&context, &session, reader, writer);
    context.close(&session);
    context.shutdown();
    served
}

/// Runs one host connection with the system shell.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the streams fail.
pub fn run<I: BufRead, O: Write>(
    config: &Config,
    client_name: &str,
    reader: I,
    writer: O,
) -> Result<usize, ProtocolError> {
    run_with_runner(config, client_name, ShellRunner, reader, writer)
}
