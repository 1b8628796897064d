//! Host-facing module context and session state machine.
//!
//! [`ModuleContext`] owns everything a loaded module needs between calls:
//! the descriptor, the request router, the session reference count, the
//! negotiated payload ceiling and the enabled flag set once by the
//! dependency probe. Sessions move `Closed → Open → Closed`; a
//! [`SessionHandle`] is valid only while it carries this context's identity
//! token and at least one session is open.
//!
//! Checks run in a fixed order on every `get` and `set`: enabled flag,
//! argument validity, session validity, then routing. Read-path routing
//! failures are logged and answered with an empty successful payload;
//! write-path failures are returned.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use once_cell::sync::OnceCell;
use shim_engine::probe::DependencyProbe;
use shim_engine::{CommandRunner, Direction, Executor, Router, ShimError, Status};
use tracing::{error, info, warn};

use crate::info::ModuleInfo;
use crate::payload::Payload;

/// Tracing target for host protocol calls.
const CONTEXT_TARGET: &str = "shim_module::context";

/// Identity tokens handed to contexts; 0 is never issued.
static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

/// Opaque session token returned by [`ModuleContext::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    identity: u64,
    client_name: String,
}

impl SessionHandle {
    /// Returns a handle that no context ever accepts.
    #[must_use]
    pub fn detached(client_name: impl Into<String>) -> Self {
        Self {
            identity: 0,
            client_name: client_name.into(),
        }
    }

    /// Returns the client name the session was opened for.
    #[must_use]
    pub const fn client_name(&self) -> &str {
        self.client_name.as_str()
    }
}

/// Explicit state of one loaded shim module.
///
/// # Example
///
/// ```
/// use shim_config::Backend;
/// use shim_engine::error::ShimError;
/// use shim_engine::exec::{Executor, Invocation};
/// use shim_engine::{MappingTable, Router};
/// use shim_module::{ModuleContext, ModuleInfo};
///
/// struct NoTool;
///
/// impl Executor for NoTool {
///     fn execute(&self, _invocation: &Invocation<'_>) -> Result<String, ShimError> {
///         Ok(String::from("{}"))
///     }
/// }
///
/// let table = MappingTable::builtin(Backend::Ansible);
/// let info = ModuleInfo::for_table(Backend::Ansible, &table);
/// let context = ModuleContext::new(info, Router::new(table, NoTool));
/// context.set_enabled(true);
///
/// let session = context.open("host", 0);
/// let payload = context.get(&session, "Service", "systemd").expect("routed");
/// assert_eq!(payload.as_bytes(), b"[]");
/// context.close(&session);
/// ```
#[derive(Debug)]
pub struct ModuleContext<E> {
    info: ModuleInfo,
    router: Router<E>,
    identity: u64,
    reference_count: AtomicU32,
    max_payload_bytes: AtomicU32,
    enabled: OnceCell<bool>,
    full_logging: bool,
}

impl<E> ModuleContext<E> {
    /// Creates an uninitialised (disabled) context.
    #[must_use]
    pub fn new(info: ModuleInfo, router: Router<E>) -> Self {
        Self {
            info,
            router,
            identity: NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed),
            reference_count: AtomicU32::new(0),
            max_payload_bytes: AtomicU32::new(0),
            enabled: OnceCell::new(),
            full_logging: false,
        }
    }

    /// Enables or disables payload logging.
    #[must_use]
    pub const fn with_full_logging(mut self, full_logging: bool) -> Self {
        self.full_logging = full_logging;
        self
    }

    /// Runs the dependency probe once and records whether the module may
    /// serve requests. Later calls return the first outcome.
    pub fn initialise<R: CommandRunner + ?Sized>(
        &self,
        probe: &DependencyProbe,
        runner: &R,
    ) -> bool {
        let enabled = *self.enabled.get_or_init(|| {
            probe
                .run(runner, self.full_logging)
                .inspect_err(|err| {
                    error!(
                        target: CONTEXT_TARGET,
                        module = %self.info.name,
                        error = %err,
                        "dependency probe failed; module disabled"
                    );
                })
                .is_ok()
        });
        info!(target: CONTEXT_TARGET, module = %self.info.name, enabled, "module initialised");
        enabled
    }

    /// Records the enabled flag without probing. Has no effect once the
    /// flag is set; returns the recorded value.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        *self.enabled.get_or_init(|| enabled)
    }

    /// Returns `true` when the module passed initialisation.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.get().copied().unwrap_or(false)
    }

    /// Closes every open session.
    pub fn shutdown(&self) {
        let open = self.reference_count.swap(0, Ordering::AcqRel);
        info!(target: CONTEXT_TARGET, module = %self.info.name, open, "module shutting down");
    }

    /// Returns the module descriptor.
    #[must_use]
    pub const fn info(&self) -> &ModuleInfo {
        &self.info
    }

    /// Returns the request router.
    #[must_use]
    pub const fn router(&self) -> &Router<E> {
        &self.router
    }

    /// Returns the number of open sessions.
    #[must_use]
    pub fn reference_count(&self) -> u32 {
        self.reference_count.load(Ordering::Acquire)
    }

    /// Returns the payload ceiling negotiated by the latest `open`.
    #[must_use]
    pub fn max_payload_bytes(&self) -> u32 {
        self.max_payload_bytes.load(Ordering::Acquire)
    }

    /// Returns the module descriptor as a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::SerializePayload`] or
    /// [`ShimError::OutOfMemory`] when the descriptor cannot be produced.
    pub fn get_info(&self, client_name: &str) -> Result<Payload, ShimError> {
        let text = serde_json::to_string(&self.info).map_err(ShimError::SerializePayload)?;
        let payload = Payload::from_text(&text)?;
        if self.full_logging {
            info!(target: CONTEXT_TARGET, client_name, payload = %text, "GetInfo");
        }
        Ok(payload)
    }

    /// Opens a session and records the payload ceiling (0 = unbounded).
    pub fn open(&self, client_name: &str, max_payload_bytes: u32) -> SessionHandle {
        self.max_payload_bytes
            .store(max_payload_bytes, Ordering::Release);
        let open = self
            .reference_count
            .fetch_add(1, Ordering::AcqRel)
            .saturating_add(1);
        info!(
            target: CONTEXT_TARGET,
            client_name,
            max_payload_bytes,
            open,
            "session opened"
        );
        SessionHandle {
            identity: self.identity,
            client_name: client_name.to_owned(),
        }
    }

    /// Closes a session. An invalid handle is logged and otherwise ignored.
    pub fn close(&self, handle: &SessionHandle) {
        if !self.is_valid_session(handle) {
            error!(
                target: CONTEXT_TARGET,
                client_name = handle.client_name(),
                "close called outside of a valid session"
            );
            return;
        }
        let closed = self
            .reference_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |open| {
                open.checked_sub(1)
            });
        if closed.is_ok() {
            info!(target: CONTEXT_TARGET, client_name = handle.client_name(), "session closed");
        }
    }

    /// Returns `true` when `handle` belongs to this context and a session
    /// is open.
    #[must_use]
    pub fn is_valid_session(&self, handle: &SessionHandle) -> bool {
        handle.identity == self.identity && self.reference_count() > 0
    }

    fn ensure_enabled(&self) -> Result<(), ShimError> {
        if self.is_enabled() {
            Ok(())
        } else {
            Err(ShimError::Disabled {
                module: self.info.name.clone(),
            })
        }
    }

    fn ensure_session(&self, handle: &SessionHandle, operation: &str) -> Result<(), ShimError> {
        if self.is_valid_session(handle) {
            Ok(())
        } else {
            Err(ShimError::InvalidSession {
                operation: operation.to_owned(),
            })
        }
    }

    fn ensure_supported(&self, direction: Direction, operation: &str) -> Result<(), ShimError> {
        if self.router.table().supports(direction) {
            Ok(())
        } else {
            Err(ShimError::Unsupported {
                module: self.info.name.clone(),
                operation: operation.to_owned(),
            })
        }
    }
}

impl<E: Executor> ModuleContext<E> {
    /// Reads the reported value of an object.
    ///
    /// Routing failures are logged and answered with an empty payload so
    /// that the host's polling loop keeps running. The result is cut at the
    /// negotiated ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::Disabled`], [`ShimError::InvalidArgument`],
    /// [`ShimError::InvalidSession`], [`ShimError::Unsupported`] or
    /// [`ShimError::OutOfMemory`].
    pub fn get(
        &self,
        handle: &SessionHandle,
        component: &str,
        object: &str,
    ) -> Result<Payload, ShimError> {
        let outcome = self.checked_get(handle, component, object);
        self.log_outcome("get", component, object, outcome.as_ref().err());
        outcome
    }

    /// Applies a desired-state payload to an object.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::Disabled`], [`ShimError::InvalidArgument`] for
    /// blank names or an empty or non-UTF-8 payload,
    /// [`ShimError::InvalidSession`], [`ShimError::Unsupported`], or the
    /// router's error.
    pub fn set(
        &self,
        handle: &SessionHandle,
        component: &str,
        object: &str,
        payload: &[u8],
    ) -> Result<(), ShimError> {
        let outcome = self.checked_set(handle, component, object, payload);
        self.log_outcome("set", component, object, outcome.as_ref().err());
        outcome
    }

    fn checked_get(
        &self,
        handle: &SessionHandle,
        component: &str,
        object: &str,
    ) -> Result<Payload, ShimError> {
        self.ensure_enabled()?;
        ensure_names(component, object)?;
        self.ensure_session(handle, "get")?;
        self.ensure_supported(Direction::Reported, "get")?;

        let text = match self.router.reported(component, object) {
            Ok(reported) => reported.to_string(),
            Err(err) => {
                error!(
                    target: CONTEXT_TARGET,
                    component,
                    object,
                    error = %err,
                    "get failed; returning an empty payload"
                );
                String::new()
            }
        };

        let max_payload_bytes = self.max_payload_bytes();
        let payload = Payload::bounded(&text, max_payload_bytes)?;
        if payload.is_truncated() {
            warn!(
                target: CONTEXT_TARGET,
                component,
                object,
                size = text.len(),
                max_payload_bytes,
                "payload truncated to the negotiated maximum"
            );
        }
        if self.full_logging {
            info!(
                target: CONTEXT_TARGET,
                component,
                object,
                payload = %payload.to_text_lossy(),
                "get payload"
            );
        }
        Ok(payload)
    }

    fn checked_set(
        &self,
        handle: &SessionHandle,
        component: &str,
        object: &str,
        payload: &[u8],
    ) -> Result<(), ShimError> {
        self.ensure_enabled()?;
        ensure_names(component, object)?;
        if payload.is_empty() {
            return Err(ShimError::InvalidArgument {
                message: String::from("set payload must not be empty"),
            });
        }
        let text = std::str::from_utf8(payload).map_err(|err| ShimError::InvalidArgument {
            message: format!("set payload is not valid UTF-8: {err}"),
        })?;
        self.ensure_session(handle, "set")?;
        self.ensure_supported(Direction::Desired, "set")?;

        if self.full_logging {
            info!(target: CONTEXT_TARGET, component, object, payload = text, "set payload");
        }
        self.router.desired(component, object, text)
    }

    fn log_outcome(
        &self,
        operation: &str,
        component: &str,
        object: &str,
        failure: Option<&ShimError>,
    ) {
        if let Some(err) = failure {
            error!(
                target: CONTEXT_TARGET,
                module = %self.info.name,
                operation,
                component,
                object,
                status = %err.status(),
                error = %err,
                "request failed"
            );
            return;
        }
        info!(
            target: CONTEXT_TARGET,
            module = %self.info.name,
            operation,
            component,
            object,
            status = %Status::Success,
            "request completed"
        );
    }
}

fn ensure_names(component: &str, object: &str) -> Result<(), ShimError> {
    if component.trim().is_empty() || object.trim().is_empty() {
        return Err(ShimError::InvalidArgument {
            message: String::from("component and object names must not be empty"),
        });
    }
    Ok(())
}
