//! Binary entrypoint for the `mmi-shim` host module.

use std::io::{self, BufReader};
use std::process::ExitCode;

fn main() -> ExitCode {
    let reader = BufReader::new(io::stdin().lock());
    let writer = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    shim_module::cli::run(std::env::args_os(), reader, writer, &mut stderr)
}
