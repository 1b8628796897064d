//! Host-facing adapter for the configuration-management shim.
//!
//! A host management agent loads the module, opens a session, and issues
//! `Get`/`Set` calls addressed by (component, object). This crate owns that
//! boundary:
//!
//! - [`context`] keeps the session state machine, the enabled flag and the
//!   negotiated payload ceiling, and turns every engine failure into a
//!   [`Status`](shim_engine::Status).
//! - [`protocol`] carries requests and responses as JSON lines.
//! - [`host`] wires configuration, dependency probing and serving together.
//! - [`telemetry`] installs the process-wide `tracing` subscriber.
//!
//! The `mmi-shim` binary in this crate runs one host connection over
//! stdin/stdout.

pub mod cli;
pub mod context;
pub mod host;
pub mod info;
pub mod payload;
pub mod protocol;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use self::context::{ModuleContext, SessionHandle};
pub use self::info::ModuleInfo;
pub use self::payload::{Payload, free};
pub use self::protocol::{HostRequest, HostResponse, serve};
