//! Command line and payload construction for each backend.
//!
//! Everything here is pure string/JSON building; running the result is the
//! job of a [`CommandRunner`](super::CommandRunner).

use std::path::Path;

use camino::Utf8Path;
use serde_json::{Map, Value};

use crate::mapping::ExternalTarget;

/// Ansible executable, resolved inside the activated environment.
pub const ANSIBLE_EXECUTABLE: &str = "ansible";
/// Ruby interpreter running the Chef helper.
pub const RUBY_EXECUTABLE: &str = "ruby";
/// Python interpreter running the cloud-init helper.
pub const PYTHON_EXECUTABLE: &str = "python3";
/// Chef helper script name inside the scripts directory.
pub const CHEF_HELPER: &str = "chef-exec.rb";
/// cloud-init helper script name inside the scripts directory.
pub const CLOUD_INIT_HELPER: &str = "cloud-init-exec.py";

/// Property naming the Chef resource in a desired-state element.
pub const CHEF_NAME_PROPERTY: &str = "username";
/// Fallback property naming the Chef resource.
pub const CHEF_FALLBACK_NAME_PROPERTY: &str = "name";
/// Property carrying the Chef action in a desired-state element.
pub const CHEF_ACTION_PROPERTY: &str = "action";
/// Top-level key of the cloud-init users document.
pub const CLOUD_INIT_USERS_KEY: &str = "users";

/// Quotes `text` as a single POSIX shell word.
///
/// # Example
///
/// ```
/// use shim_engine::exec::command::shell_quote;
///
/// assert_eq!(shell_quote("name=bob"), "'name=bob'");
/// assert_eq!(shell_quote("it's"), r"'it'\''s'");
/// ```
#[must_use]
pub fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Builds the ad hoc Ansible command for a target.
///
/// The virtual environment is activated first; `arguments` is omitted when
/// empty. `--one-line` keeps the result on a single `host | STATUS => {...}`
/// line.
#[must_use]
pub fn ansible_command(
    python_environment: &Utf8Path,
    target: &ExternalTarget,
    arguments: &str,
) -> String {
    let activate = python_environment.join("bin").join("activate");
    let mut command = format!(
        ". {}; {ANSIBLE_EXECUTABLE} localhost --connection local --module-name {}",
        shell_quote(activate.as_str()),
        shell_quote(&target.qualified_module()),
    );
    let trimmed = arguments.trim();
    if !trimmed.is_empty() {
        command.push_str(" --args ");
        command.push_str(&shell_quote(trimmed));
    }
    command.push_str(" --one-line");
    command
}

/// Builds the command piping a payload file into the Chef helper.
#[must_use]
pub fn chef_command(scripts_directory: &Utf8Path, payload_file: &Path) -> String {
    format!(
        "{RUBY_EXECUTABLE} {} < {}",
        shell_quote(scripts_directory.join(CHEF_HELPER).as_str()),
        shell_quote(&payload_file.to_string_lossy()),
    )
}

/// Builds the command piping a payload file into the cloud-init helper.
#[must_use]
pub fn cloud_init_command(
    scripts_directory: &Utf8Path,
    distro: &str,
    target: &ExternalTarget,
    payload_file: &Path,
) -> String {
    format!(
        "{PYTHON_EXECUTABLE} {} {} {} < {}",
        shell_quote(scripts_directory.join(CLOUD_INIT_HELPER).as_str()),
        shell_quote(distro),
        shell_quote(target.module()),
        shell_quote(&payload_file.to_string_lossy()),
    )
}

/// Builds the JSON document read by the Chef helper.
#[must_use]
pub fn chef_document(
    target: &ExternalTarget,
    name: &str,
    action: Option<&str>,
    properties: &Map<String, Value>,
) -> Value {
    let mut document = Map::new();
    document.insert(
        String::from("resource_class"),
        Value::String(target.collection().to_owned()),
    );
    document.insert(String::from("resource_name"), Value::String(name.to_owned()));
    if let Some(text) = action {
        document.insert(
            String::from(CHEF_ACTION_PROPERTY),
            Value::String(text.to_owned()),
        );
    }
    document.insert(
        String::from("properties"),
        Value::Object(properties.clone()),
    );
    Value::Object(document)
}

/// Wraps a users array in the document read by the cloud-init helper.
#[must_use]
pub fn cloud_init_document(users: Value) -> Value {
    let mut document = Map::new();
    document.insert(String::from(CLOUD_INIT_USERS_KEY), users);
    Value::Object(document)
}

/// Strips the `host | STATUS =>` prefix Ansible prints before its JSON.
///
/// Output without the marker is returned trimmed.
///
/// # Example
///
/// ```
/// use shim_engine::exec::command::strip_ansible_prefix;
///
/// let line = "localhost | SUCCESS => {\"changed\": false}\n";
/// assert_eq!(strip_ansible_prefix(line), "{\"changed\": false}");
/// ```
#[must_use]
pub fn strip_ansible_prefix(output: &str) -> &str {
    output
        .split_once("=> ")
        .map_or(output, |(_, json)| json)
        .trim()
}
