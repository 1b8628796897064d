//! Object mapping table routing host objects to external tool modules.
//!
//! A [`MappingTable`] is an ordered list of [`MappingEntry`] rows keyed by
//! (component, object, direction). Lookup is a linear, first-match scan in
//! declaration order, so if a table ever carries a repeated key the earlier
//! entry wins. Tables are built once at startup and never mutated.
//!
//! A miss is an ordinary outcome, reported as `None`; the router turns it
//! into an invalid-argument response.

mod builtin;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use shim_config::Backend;
use strum::{Display, EnumString};

use crate::error::ShimError;
use crate::recipe::Recipe;

/// Configurable unit families exposed to the host agent.
///
/// Host component names parse case-sensitively; anything else is a lookup
/// miss rather than an unhandled branch.
///
/// # Example
///
/// ```
/// use shim_engine::mapping::Component;
///
/// let component: Component = "Service".parse().expect("known component");
/// assert_eq!(component, Component::Service);
/// assert!("service".parse::<Component>().is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
pub enum Component {
    /// System services (systemd units, SysV scripts, ...).
    Service,
    /// Local user accounts.
    Users,
}

/// Whether a request reads current state or applies desired state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Read path: report what is currently configured.
    Reported,
    /// Write path: make the system match the payload.
    Desired,
}

impl Direction {
    /// Converts the host's boolean `desired` flag into a direction.
    #[must_use]
    pub const fn from_desired(desired: bool) -> Self {
        if desired { Self::Desired } else { Self::Reported }
    }

    /// Returns `true` for [`Direction::Desired`].
    #[must_use]
    pub const fn is_desired(self) -> bool {
        matches!(self, Self::Desired)
    }
}

/// Identity of a mapping entry: the host-side naming of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingKey {
    component: Component,
    object: String,
    direction: Direction,
}

impl MappingKey {
    /// Creates a key.
    #[must_use]
    pub fn new(component: Component, object: impl Into<String>, direction: Direction) -> Self {
        Self {
            component,
            object: object.into(),
            direction,
        }
    }

    /// Returns the component.
    #[must_use]
    pub const fn component(&self) -> Component {
        self.component
    }

    /// Returns the object name.
    #[must_use]
    pub const fn object(&self) -> &str {
        self.object.as_str()
    }

    /// Returns the direction.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }
}

impl std::fmt::Display for MappingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({})", self.component, self.object, self.direction)
    }
}

/// The external tool side of a mapping: what to invoke and with which
/// static arguments.
///
/// `collection` is an Ansible collection, a Chef resource class or a
/// cloud-init package; `module` is the module or resource inside it.
///
/// # Example
///
/// ```
/// use shim_config::Backend;
/// use shim_engine::mapping::ExternalTarget;
///
/// let target = ExternalTarget::new(Backend::Ansible, "ansible.builtin", "getent")
///     .with_arguments("database=passwd");
/// assert_eq!(target.qualified_module(), "ansible.builtin.getent");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalTarget {
    backend: Backend,
    collection: String,
    module: String,
    arguments: String,
}

impl ExternalTarget {
    /// Creates a target without static arguments.
    #[must_use]
    pub fn new(backend: Backend, collection: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            backend,
            collection: collection.into(),
            module: module.into(),
            arguments: String::new(),
        }
    }

    /// Sets the static argument string passed on every invocation.
    #[must_use]
    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = arguments.into();
        self
    }

    /// Returns the backend executing this target.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// Returns the collection, resource class or package.
    #[must_use]
    pub const fn collection(&self) -> &str {
        self.collection.as_str()
    }

    /// Returns the module or resource name.
    #[must_use]
    pub const fn module(&self) -> &str {
        self.module.as_str()
    }

    /// Returns the static arguments.
    #[must_use]
    pub const fn arguments(&self) -> &str {
        self.arguments.as_str()
    }

    /// Returns `collection.module`, or whichever half is non-empty.
    #[must_use]
    pub fn qualified_module(&self) -> String {
        match (self.collection.is_empty(), self.module.is_empty()) {
            (false, false) => format!("{}.{}", self.collection, self.module),
            (true, _) => self.module.clone(),
            (false, true) => self.collection.clone(),
        }
    }
}

/// One routing row of the mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    key: MappingKey,
    target: ExternalTarget,
    recipe: Recipe,
}

impl MappingEntry {
    /// Creates an entry.
    #[must_use]
    pub const fn new(key: MappingKey, target: ExternalTarget, recipe: Recipe) -> Self {
        Self {
            key,
            target,
            recipe,
        }
    }

    /// Returns the routing key.
    #[must_use]
    pub const fn key(&self) -> &MappingKey {
        &self.key
    }

    /// Returns the external target.
    #[must_use]
    pub const fn target(&self) -> &ExternalTarget {
        &self.target
    }

    /// Returns the transform recipe.
    #[must_use]
    pub const fn recipe(&self) -> Recipe {
        self.recipe
    }

    /// Checks that the entry can be routed.
    ///
    /// # Errors
    ///
    /// Returns [`ShimError::InvalidMapping`] when the object name is blank,
    /// the target names nothing, or the recipe does not fit the direction.
    pub fn validate(&self) -> Result<(), ShimError> {
        if self.key.object.trim().is_empty() {
            return Err(ShimError::InvalidMapping {
                message: format!("{}: object name must not be empty", self.key.component),
            });
        }
        if self.target.collection.is_empty() && self.target.module.is_empty() {
            return Err(ShimError::InvalidMapping {
                message: format!("{}: external target must not be empty", self.key),
            });
        }
        if self.recipe.direction() != self.key.direction {
            return Err(ShimError::InvalidMapping {
                message: format!(
                    "{}: recipe handles the {} direction",
                    self.key,
                    self.recipe.direction()
                ),
            });
        }
        Ok(())
    }

    fn matches(&self, component: Component, object: &str, direction: Direction) -> bool {
        self.key.component == component
            && self.key.direction == direction
            && self.key.object == object
    }
}

/// Ordered, read-only routing table.
///
/// # Example
///
/// ```
/// use shim_config::Backend;
/// use shim_engine::mapping::{Direction, MappingTable};
///
/// let table = MappingTable::builtin(Backend::Ansible);
/// let entry = table
///     .lookup("Service", "systemd", Direction::Reported)
///     .expect("systemd is mapped");
/// assert_eq!(entry.target().module(), "service_facts");
/// assert!(table.lookup("Service", "launchd", Direction::Reported).is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: Vec<MappingEntry>,
}

impl MappingTable {
    /// Creates a table from entries in declaration order.
    ///
    /// Repeated keys are kept; [`MappingTable::lookup`] returns the first.
    #[must_use]
    pub const fn new(entries: Vec<MappingEntry>) -> Self {
        Self { entries }
    }

    /// Returns the built-in table for a backend.
    #[must_use]
    pub fn builtin(backend: Backend) -> Self {
        Self::new(builtin::entries(backend))
    }

    /// Looks up the entry for a host component/object pair.
    ///
    /// Returns `None` for an unknown component string or an unmapped
    /// object.
    #[must_use]
    pub fn lookup(
        &self,
        component: &str,
        object: &str,
        direction: Direction,
    ) -> Option<&MappingEntry> {
        let parsed = component.parse::<Component>().ok()?;
        self.lookup_component(parsed, object, direction)
    }

    /// Looks up the entry for an already-parsed component.
    #[must_use]
    pub fn lookup_component(
        &self,
        component: Component,
        object: &str,
        direction: Direction,
    ) -> Option<&MappingEntry> {
        self.entries
            .iter()
            .find(|entry| entry.matches(component, object, direction))
    }

    /// Validates every entry.
    ///
    /// # Errors
    ///
    /// Returns the first [`ShimError::InvalidMapping`] encountered.
    pub fn validate(&self) -> Result<(), ShimError> {
        self.entries.iter().try_for_each(MappingEntry::validate)
    }

    /// Returns keys that appear more than once, in order of their second
    /// appearance.
    #[must_use]
    pub fn duplicate_keys(&self) -> Vec<&MappingKey> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(MappingEntry::key)
            .filter(|key| !seen.insert(*key))
            .collect()
    }

    /// Returns the distinct components in declaration order.
    #[must_use]
    pub fn components(&self) -> Vec<Component> {
        let mut components = Vec::new();
        for entry in &self.entries {
            if !components.contains(&entry.key.component) {
                components.push(entry.key.component);
            }
        }
        components
    }

    /// Returns `true` when at least one entry serves `direction`.
    #[must_use]
    pub fn supports(&self, direction: Direction) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.key.direction == direction)
    }

    /// Returns all entries in declaration order.
    #[must_use]
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the table has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
