//! Line-delimited JSON protocol between a host agent and the module.
//!
//! Each request line is a [`HostRequest`] tagged by `op`; each is answered
//! by exactly one [`HostResponse`] line carrying the status, its `errno`
//! code and, for `info` and `get`, the payload text. A line that does not
//! parse is answered with an invalid-argument response and serving
//! continues.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shim_engine::{Executor, ShimError, Status};
use thiserror::Error;
use tracing::{debug, warn};

use crate::context::{ModuleContext, SessionHandle};
use crate::payload::Payload;

/// Tracing target for the wire protocol.
const PROTOCOL_TARGET: &str = "shim_module::protocol";

/// One host request.
///
/// # Example
///
/// ```
/// use shim_module::HostRequest;
///
/// let request: HostRequest =
///     serde_json::from_str(r#"{"op":"get","component":"Service","object":"systemd"}"#)
///         .expect("valid request");
/// assert_eq!(
///     request,
///     HostRequest::Get {
///         component: String::from("Service"),
///         object: String::from("systemd"),
///     }
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostRequest {
    /// Return the module descriptor.
    Info,
    /// Read the reported value of an object.
    Get {
        /// Component name.
        component: String,
        /// Object name.
        object: String,
    },
    /// Apply a desired-state payload to an object.
    Set {
        /// Component name.
        component: String,
        /// Object name.
        object: String,
        /// JSON payload text.
        payload: String,
    },
}

/// One host response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostResponse {
    /// Outcome of the request.
    pub status: Status,
    /// `errno`-style code for `status` (0 on success).
    pub errno: i32,
    /// Payload text for `info` and `get`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl HostResponse {
    /// Builds a successful response.
    #[must_use]
    pub fn success(payload: Option<&Payload>) -> Self {
        Self {
            status: Status::Success,
            errno: 0,
            payload: payload.map(|bytes| bytes.to_text_lossy().into_owned()),
        }
    }

    /// Builds the response reporting `err`.
    #[must_use]
    pub const fn from_error(err: &ShimError) -> Self {
        let status = err.status();
        Self {
            status,
            errno: status.errno(),
            payload: None,
        }
    }
}

/// Errors that end a serving loop.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    /// Reading a request line failed.
    #[error("failed to read request: {0}")]
    Read(#[source] Arc<io::Error>),
    /// Writing a response line failed.
    #[error("failed to write response: {0}")]
    Write(#[source] Arc<io::Error>),
    /// A response could not be encoded.
    #[error("failed to encode response: {0}")]
    Serialize(#[source] Arc<serde_json::Error>),
}

/// Answers every request line from `reader` on `writer` until end of input.
///
/// Blank lines are skipped. Lines that are not UTF-8 or do not decode as a
/// [`HostRequest`] are answered with an invalid-argument response. Returns
/// the number of requests answered.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the streams fail.
pub fn serve<E, R, W>(
    context: &ModuleContext<E>,
    session: &SessionHandle,
    mut reader: R,
    mut writer: W,
) -> Result<usize, ProtocolError>
where
    E: Executor,
    R: BufRead,
    W: Write,
{
    let mut answered = 0_usize;
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|err| ProtocolError::Read(Arc::new(err)))?;
        if read == 0 {
            break;
        }
        if line.trim_ascii().is_empty() {
            continue;
        }

        let response = match decode_request(&line) {
            Ok(request) => handle(context, session, &request),
            Err(err) => {
                warn!(target: PROTOCOL_TARGET, error = %err, "malformed request line");
                HostResponse::from_error(&err)
            }
        };

        let encoded =
            serde_json::to_string(&response).map_err(|err| ProtocolError::Serialize(Arc::new(err)))?;
        writeln!(writer, "{encoded}").map_err(|err| ProtocolError::Write(Arc::new(err)))?;
        writer
            .flush()
            .map_err(|err| ProtocolError::Write(Arc::new(err)))?;
        answered = answered.saturating_add(1);
    }
    debug!(target: PROTOCOL_TARGET, answered, "request stream ended");
    Ok(answered)
}

fn decode_request(line: &[u8]) -> Result<HostRequest, ShimError> {
    let text = std::str::from_utf8(line).map_err(|err| ShimError::InvalidArgument {
        message: format!("request line is not UTF-8: {err}"),
    })?;
    serde_json::from_str(text).map_err(|err| ShimError::parse("host request", err))
}

/// Executes one request against the context.
#[must_use]
pub fn handle<E: Executor>(
    context: &ModuleContext<E>,
    session: &SessionHandle,
    request: &HostRequest,
) -> HostResponse {
    let outcome = match request {
        HostRequest::Info => context
            .get_info(session.client_name())
            .map(|payload| HostResponse::success(Some(&payload))),
        HostRequest::Get { component, object } => context
            .get(session, component, object)
            .map(|payload| HostResponse::success(Some(&payload))),
        HostRequest::Set {
            component,
            object,
            payload,
        } => context
            .set(session, component, object, payload.as_bytes())
            .map(|()| HostResponse::success(None)),
    };
    outcome.unwrap_or_else(|err| HostResponse::from_error(&err))
}
