//! Transform recipes attached to mapping entries.
//!
//! A [`Recipe`] says how data crosses the boundary for one mapping entry:
//! reported entries carry a [`ReshapeRecipe`] that turns raw tool output
//! into the host-facing document, desired entries carry an [`ArgsRecipe`]
//! that turns the host's array into per-element tool arguments.

use serde_json::{Map, Value};

use crate::error::ShimError;
use crate::exec::Arguments;
use crate::exec::command::{
    CHEF_ACTION_PROPERTY, CHEF_FALLBACK_NAME_PROPERTY, CHEF_NAME_PROPERTY, cloud_init_document,
};
use crate::mapping::{Direction, MappingKey};
use crate::transform::{
    entries_to_records, extract_path, object_to_arg_string, project_property,
    prune_by_property_equals,
};

/// Path of the service table in `service_facts` output.
const SERVICES_PATH: &str = "ansible_facts.services";
/// Path of the passwd table in `getent` output.
const PASSWD_PATH: &str = "ansible_facts.getent_passwd";
/// Field names of a passwd row after the user name.
const PASSWD_FIELDS: [&str; 6] = ["password", "uid", "gid", "comment", "home", "shell"];

/// How a mapping entry transforms data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipe {
    /// Reshape tool output for a reported read.
    Reshape(ReshapeRecipe),
    /// Build tool arguments for a desired write.
    ToArgs(ArgsRecipe),
}

impl Recipe {
    /// Returns the direction this recipe serves.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Reshape(_) => Direction::Reported,
            Self::ToArgs(_) => Direction::Desired,
        }
    }
}

/// Reshapes raw tool output into the reported document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReshapeRecipe {
    /// Names of services whose `source` equals the requested object and
    /// whose `state` is `running`, in tool order.
    RunningServices,
    /// One record per passwd entry.
    PasswdUsers,
    /// The parsed output, unchanged; the default for reported entries that
    /// define no reshape.
    #[default]
    Passthrough,
}

impl ReshapeRecipe {
    /// Applies the recipe to parsed tool output.
    ///
    /// A missing subtree produces an empty array rather than an error.
    ///
    /// # Example
    ///
    /// ```
    /// use serde_json::json;
    /// use shim_engine::recipe::ReshapeRecipe;
    ///
    /// let raw = json!({"ansible_facts": {"services": {
    ///     "nginx.service": {"name": "nginx", "source": "systemd", "state": "running"},
    ///     "cron.service": {"name": "cron", "source": "sysv", "state": "running"},
    /// }}});
    /// let reported = ReshapeRecipe::RunningServices.apply(raw, "systemd");
    /// assert_eq!(reported, json!(["nginx"]));
    /// ```
    #[must_use]
    pub fn apply(self, raw: Value, object: &str) -> Value {
        match self {
            Self::RunningServices => {
                let Some(mut services) = extract_path(raw, SERVICES_PATH) else {
                    return Value::Array(Vec::new());
                };
                prune_by_property_equals(&mut services, "source", object);
                prune_by_property_equals(&mut services, "state", "running");
                project_property(services, "name")
            }
            Self::PasswdUsers => extract_path(raw, PASSWD_PATH).map_or_else(
                || Value::Array(Vec::new()),
                |passwd| entries_to_records(passwd, &PASSWD_FIELDS),
            ),
            Self::Passthrough => raw,
        }
    }
}

/// Per-element outcome of building desired-state arguments.
pub type ElementArguments = Result<Arguments, ShimError>;

/// Builds tool arguments from a desired-state array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgsRecipe {
    /// One `key=value` argument string per element, for Ansible modules.
    KeyValue,
    /// One Chef resource per element.
    ChefResource,
    /// The whole array as a single cloud-init `users` document.
    CloudInitConfig,
}

impl ArgsRecipe {
    /// Builds the invocations' arguments for a desired payload.
    ///
    /// The outer result fails when the payload as a whole is unusable. The
    /// inner results are per element so that one malformed element does
    /// not stop the others from being applied. `static_arguments` are
    /// prepended to every key/value string.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::InvalidShape`] when `desired` is not an array
    /// and [`ShimError::InvalidArgument`] when the array is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use serde_json::json;
    /// use shim_engine::exec::Arguments;
    /// use shim_engine::mapping::{Component, Direction, MappingKey};
    /// use shim_engine::recipe::ArgsRecipe;
    ///
    /// let key = MappingKey::new(Component::Service, "desiredServices", Direction::Desired);
    /// let desired = json!([{"name": "nginx", "state": "started"}]);
    /// let built = ArgsRecipe::KeyValue.build(desired, &key, "").expect("array");
    /// assert!(matches!(
    ///     built.first(),
    ///     Some(Ok(Arguments::KeyValue(text))) if text == "name=nginx state=started "
    /// ));
    /// ```
    pub fn build(
        self,
        desired: Value,
        key: &MappingKey,
        static_arguments: &str,
    ) -> Result<Vec<ElementArguments>, ShimError> {
        let Value::Array(elements) = desired else {
            return Err(ShimError::InvalidShape {
                message: format!("desired payload for {key} must be a JSON array"),
            });
        };
        if elements.is_empty() {
            return Err(ShimError::InvalidArgument {
                message: format!("desired payload for {key} contains no elements"),
            });
        }

        let built: Vec<ElementArguments> = match self {
            Self::KeyValue => elements
                .iter()
                .enumerate()
                .map(|(index, element)| key_value_arguments(element, key, index, static_arguments))
                .collect(),
            Self::ChefResource => elements
                .into_iter()
                .enumerate()
                .map(|(index, element)| chef_resource(element, key, index))
                .collect(),
            Self::CloudInitConfig => vec![Ok(Arguments::Document(cloud_init_document(
                Value::Array(elements),
            )))],
        };
        Ok(built)
    }
}

fn key_value_arguments(
    element: &Value,
    key: &MappingKey,
    index: usize,
    static_arguments: &str,
) -> ElementArguments {
    let generated = object_to_arg_string(element);
    if generated.is_empty() {
        return Err(empty_arguments(key, index));
    }
    let fixed = static_arguments.trim();
    if fixed.is_empty() {
        Ok(Arguments::KeyValue(generated))
    } else {
        Ok(Arguments::KeyValue(format!("{fixed} {generated}")))
    }
}

fn chef_resource(element: Value, key: &MappingKey, index: usize) -> ElementArguments {
    let Value::Object(fields) = element else {
        return Err(ShimError::InvalidShape {
            message: format!("element {index} for {key} must be a JSON object"),
        });
    };
    if fields.is_empty() {
        return Err(empty_arguments(key, index));
    }

    let name = [CHEF_NAME_PROPERTY, CHEF_FALLBACK_NAME_PROPERTY]
        .iter()
        .find_map(|property| fields.get(*property).and_then(Value::as_str))
        .map(str::to_owned)
        .ok_or_else(|| ShimError::InvalidShape {
            message: format!(
                "element {index} for {key} needs a '{CHEF_NAME_PROPERTY}' or \
                 '{CHEF_FALLBACK_NAME_PROPERTY}' string"
            ),
        })?;
    let action = fields
        .get(CHEF_ACTION_PROPERTY)
        .and_then(Value::as_str)
        .map(str::to_owned);
    let properties: Map<String, Value> = fields
        .into_iter()
        .filter(|(property, _)| property != CHEF_ACTION_PROPERTY)
        .collect();

    Ok(Arguments::Resource {
        name,
        action,
        properties,
    })
}

fn empty_arguments(key: &MappingKey, index: usize) -> ShimError {
    ShimError::EmptyArguments {
        component: key.component().to_string(),
        object: key.object().to_owned(),
        index,
    }
}

#[cfg(test)]
mod tests;
