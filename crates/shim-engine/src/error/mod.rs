//! Domain errors raised by the mapping and transform engine.
//!
//! Internal failures carry structured context so callers can log the
//! offending component, object or command. At the host boundary every
//! [`ShimError`] collapses into one [`Status`] through
//! [`ShimError::status`]. I/O errors are wrapped in `Arc` to satisfy the
//! `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapping::Direction;

/// `errno` value reported for [`Status::PermissionDenied`].
pub const EPERM: i32 = 1;
/// `errno` value reported for [`Status::OutOfMemory`].
pub const ENOMEM: i32 = 12;
/// `errno` value reported for [`Status::InvalidArgument`].
pub const EINVAL: i32 = 22;

/// Result codes returned across the host-facing boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The call completed.
    Success,
    /// Bad input, unsupported object, invalid session or tool failure.
    InvalidArgument,
    /// A response buffer could not be allocated.
    OutOfMemory,
    /// The operation is unsupported or the module is disabled.
    PermissionDenied,
}

impl Status {
    /// Returns the `errno`-style code for this status (0 for success).
    #[must_use]
    pub const fn errno(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InvalidArgument => EINVAL,
            Self::OutOfMemory => ENOMEM,
            Self::PermissionDenied => EPERM,
        }
    }

    /// Returns `true` for [`Status::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Success => "success",
            Self::InvalidArgument => "invalid argument",
            Self::OutOfMemory => "out of memory",
            Self::PermissionDenied => "permission denied",
        };
        f.write_str(text)
    }
}

/// Errors arising while routing, executing or reshaping a request.
#[derive(Debug, Error)]
pub enum ShimError {
    /// No mapping entry exists for the requested object.
    #[error("no {direction} mapping for component '{component}' object '{object}'")]
    MappingNotFound {
        /// Component name as received from the host.
        component: String,
        /// Object name as received from the host.
        object: String,
        /// Requested direction.
        direction: Direction,
    },

    /// A mapping table entry is internally inconsistent.
    #[error("invalid mapping entry: {message}")]
    InvalidMapping {
        /// Description of the inconsistency.
        message: String,
    },

    /// The external command could not be started.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        /// Command line that was attempted.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The external command exited with a non-zero status.
    #[error("'{command}' exited with status {status}")]
    NonZeroExit {
        /// Command line that was run.
        command: String,
        /// Process exit status, -1 when terminated by a signal.
        status: i32,
    },

    /// The external command succeeded but printed nothing.
    #[error("'{command}' produced no output")]
    EmptyOutput {
        /// Command line that was run.
        command: String,
    },

    /// Tool output or a host payload was not valid JSON.
    #[error("failed to parse JSON: {message}")]
    Parse {
        /// Human-readable description of the parse failure.
        message: String,
        /// Optional underlying JSON error.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Parsed JSON did not have the shape a recipe requires.
    #[error("unexpected JSON shape: {message}")]
    InvalidShape {
        /// Description of the mismatch.
        message: String,
    },

    /// A desired-state element produced no arguments.
    #[error("element {index} for '{component}/{object}' produced no arguments")]
    EmptyArguments {
        /// Component name.
        component: String,
        /// Object name.
        object: String,
        /// Position of the element in the host array.
        index: usize,
    },

    /// The scratch payload file could not be written.
    #[error("failed to write scratch file in '{}': {source}", directory.display())]
    ScratchFile {
        /// Directory the file was created in.
        directory: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A JSON value could not be serialised.
    #[error("failed to serialise JSON: {0}")]
    SerializePayload(#[source] serde_json::Error),

    /// The host called with a handle that is not an open session.
    #[error("{operation} called outside of a valid session")]
    InvalidSession {
        /// Protocol operation that was attempted.
        operation: String,
    },

    /// The host supplied an argument the protocol rejects.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument.
        message: String,
    },

    /// The module failed its dependency probe and will not run.
    #[error("{module} cannot find its dependencies and will not run")]
    Disabled {
        /// Module name.
        module: String,
    },

    /// The module exposes no objects for the requested operation.
    #[error("{module} does not support {operation}")]
    Unsupported {
        /// Module name.
        module: String,
        /// Protocol operation that was attempted.
        operation: String,
    },

    /// A response buffer could not be allocated.
    #[error("failed to allocate {bytes} bytes")]
    OutOfMemory {
        /// Requested buffer size.
        bytes: usize,
    },

    /// A dependency check failed.
    #[error("dependency check '{check}' failed")]
    Dependency {
        /// Description of the failing check.
        check: String,
        /// Underlying failure.
        #[source]
        source: Box<ShimError>,
    },
}

impl ShimError {
    /// Maps the error onto the host-facing status taxonomy.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Disabled { .. } | Self::Unsupported { .. } => Status::PermissionDenied,
            Self::OutOfMemory { .. } => Status::OutOfMemory,
            _ => Status::InvalidArgument,
        }
    }

    /// Builds a [`ShimError::Parse`] from a `serde_json` error.
    #[must_use]
    pub fn parse(context: &str, source: serde_json::Error) -> Self {
        Self::Parse {
            message: format!("{context}: {source}"),
            source: Some(source),
        }
    }
}

#[cfg(test)]
mod tests;
