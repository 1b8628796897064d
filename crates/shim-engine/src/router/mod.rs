//! Request router tying the mapping table to an executor.
//!
//! The [`Router`] resolves a host request against its [`MappingTable`],
//! builds the invocation from the entry's recipe, delegates to an
//! [`Executor`], and reshapes the result. It holds no session state; the
//! host adapter validates sessions before routing.
//!
//! The executor abstraction lets tests inject canned tool output without
//! spawning processes.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ShimError;
use crate::exec::{Arguments, Executor, Invocation};
use crate::mapping::{Direction, MappingEntry, MappingTable};
use crate::recipe::Recipe;
use crate::transform::array_to_arg_block;

/// Tracing target for request routing.
const ROUTER_TARGET: &str = "shim_engine::router";

/// Routes reported and desired requests through the mapping table.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use shim_config::Backend;
/// use shim_engine::error::ShimError;
/// use shim_engine::exec::{Executor, Invocation};
/// use shim_engine::mapping::MappingTable;
/// use shim_engine::router::Router;
///
/// struct FactsExecutor;
///
/// impl Executor for FactsExecutor {
///     fn execute(&self, _invocation: &Invocation<'_>) -> Result<String, ShimError> {
///         Ok(json!({"ansible_facts": {"services": {
///             "nginx.service": {"name": "nginx", "source": "systemd", "state": "running"}
///         }}})
///         .to_string())
///     }
/// }
///
/// let router = Router::new(MappingTable::builtin(Backend::Ansible), FactsExecutor);
/// let reported = router.reported("Service", "systemd").expect("mapped object");
/// assert_eq!(reported, json!(["nginx"]));
/// ```
#[derive(Debug)]
pub struct Router<E> {
    table: MappingTable,
    executor: E,
    full_logging: bool,
}

impl<E> Router<E> {
    /// Creates a router with payload logging disabled.
    #[must_use]
    pub const fn new(table: MappingTable, executor: E) -> Self {
        Self {
            table,
            executor,
            full_logging: false,
        }
    }

    /// Enables or disables logging of payloads and tool output.
    #[must_use]
    pub const fn with_full_logging(mut self, full_logging: bool) -> Self {
        self.full_logging = full_logging;
        self
    }

    /// Returns the mapping table.
    #[must_use]
    pub const fn table(&self) -> &MappingTable {
        &self.table
    }

    /// Returns the executor.
    #[must_use]
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    fn resolve(
        &self,
        component: &str,
        object: &str,
        direction: Direction,
    ) -> Result<&MappingEntry, ShimError> {
        self.table
            .lookup(component, object, direction)
            .ok_or_else(|| ShimError::MappingNotFound {
                component: component.to_owned(),
                object: object.to_owned(),
                direction,
            })
    }
}

impl<E: Executor> Router<E> {
    /// Reads the reported value of an object.
    ///
    /// Runs the mapped tool with the entry's static arguments, parses its
    /// JSON output and applies the entry's reshape recipe.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::MappingNotFound`] for an unmapped object, the
    /// executor's error when the tool fails, [`ShimError::EmptyOutput`]
    /// when it prints nothing, [`ShimError::Parse`] for invalid JSON, and
    /// [`ShimError::InvalidShape`] when the output root is not an object.
    pub fn reported(&self, component: &str, object: &str) -> Result<Value, ShimError> {
        let entry = self.resolve(component, object, Direction::Reported)?;
        let Recipe::Reshape(recipe) = entry.recipe() else {
            return Err(ShimError::InvalidMapping {
                message: format!("{} has no reshape recipe", entry.key()),
            });
        };

        let target = entry.target();
        let invocation = Invocation::new(target, Arguments::KeyValue(target.arguments().to_owned()));
        let output = self.executor.execute(&invocation)?;
        if output.trim().is_empty() {
            return Err(ShimError::EmptyOutput {
                command: target.qualified_module(),
            });
        }

        let parsed: Value = serde_json::from_str(&output)
            .map_err(|err| ShimError::parse(&target.qualified_module(), err))?;
        if !parsed.is_object() {
            return Err(ShimError::InvalidShape {
                message: format!("{} output must be a JSON object", target.qualified_module()),
            });
        }

        let reported = recipe.apply(parsed, object);
        if self.full_logging {
            info!(
                target: ROUTER_TARGET,
                key = %entry.key(),
                reported = %reported,
                "reported value"
            );
        }
        Ok(reported)
    }

    /// Applies a desired-state payload to an object.
    ///
    /// `payload` must be a JSON array. Every element is attempted even when
    /// an earlier one fails; the error of the last failing element is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::MappingNotFound`] for an unmapped object,
    /// [`ShimError::Parse`] for invalid JSON, the recipe's payload-level
    /// error, or the last per-element failure.
    pub fn desired(&self, component: &str, object: &str, payload: &str) -> Result<(), ShimError> {
        let entry = self.resolve(component, object, Direction::Desired)?;
        let Recipe::ToArgs(recipe) = entry.recipe() else {
            return Err(ShimError::InvalidMapping {
                message: format!("{} has no argument recipe", entry.key()),
            });
        };

        let desired: Value = serde_json::from_str(payload)
            .map_err(|err| ShimError::parse(&format!("desired payload for {}", entry.key()), err))?;
        if self.full_logging {
            info!(
                target: ROUTER_TARGET,
                key = %entry.key(),
                arguments = %array_to_arg_block(&desired),
                "applying desired state"
            );
        }

        let target = entry.target();
        let built = recipe.build(desired, entry.key(), target.arguments())?;
        let attempted = built.len();
        let mut last_error = None;
        for (index, element) in built.into_iter().enumerate() {
            let outcome = element.and_then(|arguments| {
                self.executor
                    .execute(&Invocation::new(target, arguments))
            });
            match outcome {
                Ok(output) => {
                    debug!(target: ROUTER_TARGET, key = %entry.key(), index, "element applied");
                    if self.full_logging && !output.trim().is_empty() {
                        info!(target: ROUTER_TARGET, index, output = %output.trim(), "tool output");
                    }
                }
                Err(err) => {
                    warn!(
                        target: ROUTER_TARGET,
                        key = %entry.key(),
                        index,
                        error = %err,
                        "element failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        last_error.map_or_else(
            || {
                debug!(target: ROUTER_TARGET, key = %entry.key(), attempted, "desired state applied");
                Ok(())
            },
            Err,
        )
    }
}
