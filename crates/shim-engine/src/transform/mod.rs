//! Generic JSON filter and reshape primitives.
//!
//! The primitives operate on [`serde_json::Value`] trees shaped like
//! configuration-management tool output: an object whose members are
//! themselves objects (for example Ansible's `ansible_facts.services`).
//!
//! Every primitive tolerates the wrong shape. A root that is not an object
//! (or not an array, for [`array_to_arg_block`]) yields an empty result
//! instead of an error, and callers decide whether emptiness matters.
//!
//! Object key order is insertion order (`serde_json` is built with
//! `preserve_order`), which makes argument strings deterministic.

use serde_json::{Map, Value};

/// Takes the subtree at a dot-separated object path.
///
/// Each segment must name a member of an object. Returns `None` when a
/// segment is missing or an intermediate node is not an object. An empty
/// path returns the whole tree.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use shim_engine::transform::extract_path;
///
/// let tree = json!({"ansible_facts": {"services": {"a": {}}}});
/// let services = extract_path(tree, "ansible_facts.services");
/// assert_eq!(services, Some(json!({"a": {}})));
/// ```
#[must_use]
pub fn extract_path(tree: Value, path: &str) -> Option<Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(tree, |node, segment| match node {
            Value::Object(mut members) => members.remove(segment),
            _ => None,
        })
}

/// Removes every member object whose `property` is not the string
/// `expected`.
///
/// Members lacking the property, or holding a non-string value, are
/// removed. Members that are not objects are left untouched. The member
/// container is rebuilt in a single pass, so every member is examined
/// exactly once. Returns the number of members removed.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use shim_engine::transform::prune_by_property_equals;
///
/// let mut tree = json!({
///     "a": {"state": "running"},
///     "b": {"state": "stopped"},
///     "c": {"name": "c"},
/// });
/// let removed = prune_by_property_equals(&mut tree, "state", "running");
/// assert_eq!(removed, 2);
/// assert_eq!(tree, json!({"a": {"state": "running"}}));
/// ```
pub fn prune_by_property_equals(tree: &mut Value, property: &str, expected: &str) -> usize {
    let Value::Object(members) = tree else {
        return 0;
    };

    let before = members.len();
    let kept: Map<String, Value> = std::mem::take(members)
        .into_iter()
        .filter(|(_, member)| keeps_member(member, property, expected))
        .collect();
    *members = kept;
    before.saturating_sub(members.len())
}

fn keeps_member(member: &Value, property: &str, expected: &str) -> bool {
    member.as_object().is_none_or(|fields| {
        fields.get(property).and_then(Value::as_str) == Some(expected)
    })
}

/// Replaces an object-of-objects with the array of each member's
/// `property` value.
///
/// Consumes the tree. Members lacking the property, and members that are
/// not objects, contribute nothing. Surviving values keep member order.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use shim_engine::transform::project_property;
///
/// let tree = json!({"a": {"name": "nginx"}, "b": {}, "c": {"name": "sshd"}});
/// assert_eq!(project_property(tree, "name"), json!(["nginx", "sshd"]));
/// ```
#[must_use]
pub fn project_property(tree: Value, property: &str) -> Value {
    let Value::Object(members) = tree else {
        return Value::Array(Vec::new());
    };

    members
        .into_iter()
        .filter_map(|(_, member)| match member {
            Value::Object(mut fields) => fields.remove(property),
            _ => None,
        })
        .collect()
}

/// Converts an object whose members are arrays into an array of records.
///
/// Each record holds `"name"` (the member key) followed by `fields` zipped
/// with the member's array items. Surplus items are dropped and missing
/// items leave the field out. Members that are not arrays are skipped.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use shim_engine::transform::entries_to_records;
///
/// let tree = json!({"root": ["x", "0"]});
/// let records = entries_to_records(tree, &["password", "uid", "gid"]);
/// assert_eq!(records, json!([{"name": "root", "password": "x", "uid": "0"}]));
/// ```
#[must_use]
pub fn entries_to_records(tree: Value, fields: &[&str]) -> Value {
    let Value::Object(members) = tree else {
        return Value::Array(Vec::new());
    };

    members
        .into_iter()
        .filter_map(|(key, member)| {
            let Value::Array(items) = member else {
                return None;
            };
            let mut record = Map::new();
            record.insert(String::from("name"), Value::String(key));
            for (field, item) in fields.iter().zip(items) {
                record.insert((*field).to_owned(), item);
            }
            Some(Value::Object(record))
        })
        .collect()
}

/// Renders an object's string members as `key=value ` pairs.
///
/// Each pair is followed by a single space. Non-string members are
/// skipped, and a non-object value yields an empty string.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use shim_engine::transform::object_to_arg_string;
///
/// let object = json!({"name": "nginx", "enabled": true, "state": "running"});
/// assert_eq!(object_to_arg_string(&object), "name=nginx state=running ");
/// ```
#[must_use]
pub fn object_to_arg_string(value: &Value) -> String {
    let Some(members) = value.as_object() else {
        return String::new();
    };

    members
        .iter()
        .filter_map(|(key, member)| member.as_str().map(|text| (key, text)))
        .fold(String::new(), |mut acc, (key, text)| {
            acc.push_str(key);
            acc.push('=');
            acc.push_str(text);
            acc.push(' ');
            acc
        })
}

/// Renders each array element with [`object_to_arg_string`], one line per
/// element.
///
/// Elements that render to nothing are skipped. A non-array value yields
/// an empty string.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use shim_engine::transform::array_to_arg_block;
///
/// let array = json!([{"name": "nginx"}, {"name": "sshd"}]);
/// assert_eq!(array_to_arg_block(&array), "name=nginx \nname=sshd \n");
/// ```
#[must_use]
pub fn array_to_arg_block(value: &Value) -> String {
    let Some(elements) = value.as_array() else {
        return String::new();
    };

    elements
        .iter()
        .map(object_to_arg_string)
        .filter(|line| !line.is_empty())
        .fold(String::new(), |mut acc, line| {
            acc.push_str(&line);
            acc.push('\n');
            acc
        })
}
