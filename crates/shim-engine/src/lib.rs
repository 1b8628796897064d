//! Object mapping and JSON transform engine for configuration-management
//! shim modules.
//!
//! A host management agent addresses configuration by (component, object)
//! pairs and exchanges JSON. This crate bridges that model to external
//! configuration-management tools (Ansible, Chef Infra, cloud-init):
//!
//! - [`mapping`] holds the read-only table routing each host object to an
//!   external tool module, together with a transform [`recipe`].
//! - [`transform`] provides the generic JSON filter and reshape primitives
//!   the recipes are built from.
//! - [`exec`] runs the external tools, behind the [`Executor`] and
//!   [`CommandRunner`] seams.
//! - [`router`] ties these together: look up, execute, reshape.
//! - [`probe`] verifies at startup that a backend's tool chain is present.
//!
//! Every failure is a [`ShimError`] that collapses into a host-facing
//! [`Status`] at the protocol boundary.
//!
//! # Example
//!
//! ```rust,no_run
//! use shim_config::Config;
//! use shim_engine::exec::{ProcessExecutor, ShellRunner, ToolPaths};
//! use shim_engine::{MappingTable, Router};
//!
//! let config = Config::default();
//! let executor = ProcessExecutor::new(ShellRunner, ToolPaths::from_config(&config));
//! let router = Router::new(MappingTable::builtin(config.backend), executor);
//! let running = router.reported("Service", "systemd");
//! ```

pub mod error;
pub mod exec;
pub mod mapping;
pub mod probe;
pub mod recipe;
pub mod router;
pub mod transform;

#[cfg(test)]
mod tests;

pub use self::error::{ShimError, Status};
pub use self::exec::{CommandRunner, Executor};
pub use self::mapping::{Component, Direction, MappingTable};
pub use self::probe::DependencyProbe;
pub use self::router::Router;
