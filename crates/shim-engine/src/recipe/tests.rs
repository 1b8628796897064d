//! Unit tests for transform recipes.

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;
use crate::mapping::Component;

#[fixture]
fn services_key() -> MappingKey {
    MappingKey::new(Component::Service, "desiredServices", Direction::Desired)
}

#[fixture]
fn users_key() -> MappingKey {
    MappingKey::new(Component::Users, "desiredUsers", Direction::Desired)
}

// ---------------------------------------------------------------------------
// Recipe
// ---------------------------------------------------------------------------

#[rstest]
#[case::reshape(Recipe::Reshape(ReshapeRecipe::Passthrough), Direction::Reported)]
#[case::to_args(Recipe::ToArgs(ArgsRecipe::KeyValue), Direction::Desired)]
fn recipe_direction(#[case] recipe: Recipe, #[case] expected: Direction) {
    assert_eq!(recipe.direction(), expected);
}

// ---------------------------------------------------------------------------
// ReshapeRecipe
// ---------------------------------------------------------------------------

#[test]
fn running_services_filter_by_source_and_state() {
    let raw = json!({"ansible_facts": {"services": {
        "nginx.service": {"name": "nginx", "source": "systemd", "state": "running"},
        "x.service": {"name": "x", "source": "systemd", "state": "stopped"},
        "cron": {"name": "cron", "source": "sysv", "state": "running"},
        "sshd.service": {"name": "sshd", "source": "systemd", "state": "running"}
    }}});
    assert_eq!(
        ReshapeRecipe::RunningServices.apply(raw, "systemd"),
        json!(["nginx", "sshd"])
    );
}

#[rstest]
#[case::no_facts(json!({"changed": false}))]
#[case::services_not_object(json!({"ansible_facts": {"services": []}}))]
#[case::no_match(json!({"ansible_facts": {"services": {
    "cron": {"name": "cron", "source": "sysv", "state": "running"}
}}}))]
fn running_services_empty_cases(#[case] raw: Value) {
    assert_eq!(ReshapeRecipe::RunningServices.apply(raw, "systemd"), json!([]));
}

#[test]
fn passwd_users_become_records() {
    let raw = json!({"ansible_facts": {"getent_passwd": {
        "root": ["x", "0", "0", "root", "/root", "/bin/bash"]
    }}});
    assert_eq!(
        ReshapeRecipe::PasswdUsers.apply(raw, "users"),
        json!([{
            "name": "root", "password": "x", "uid": "0", "gid": "0",
            "comment": "root", "home": "/root", "shell": "/bin/bash"
        }])
    );
}

#[test]
fn passwd_users_missing_table_is_empty() {
    assert_eq!(ReshapeRecipe::PasswdUsers.apply(json!({}), "users"), json!([]));
}

#[test]
fn passthrough_returns_input() {
    let raw = json!({"anything": [1, 2]});
    assert_eq!(ReshapeRecipe::Passthrough.apply(raw.clone(), "x"), raw);
}

#[test]
fn passthrough_is_the_default_reshape() {
    assert_eq!(ReshapeRecipe::default(), ReshapeRecipe::Passthrough);
}

// ---------------------------------------------------------------------------
// ArgsRecipe: payload-level errors
// ---------------------------------------------------------------------------

#[rstest]
#[case::object(json!({"name": "nginx"}))]
#[case::string(json!("name=nginx"))]
#[case::null(Value::Null)]
fn non_array_payload_is_invalid_shape(services_key: MappingKey, #[case] desired: Value) {
    let err = ArgsRecipe::KeyValue
        .build(desired, &services_key, "")
        .expect_err("not an array");
    assert!(matches!(err, ShimError::InvalidShape { .. }));
}

#[rstest]
#[case::key_value(ArgsRecipe::KeyValue)]
#[case::chef(ArgsRecipe::ChefResource)]
#[case::cloud_init(ArgsRecipe::CloudInitConfig)]
fn empty_array_is_rejected(users_key: MappingKey, #[case] recipe: ArgsRecipe) {
    let err = recipe
        .build(json!([]), &users_key, "")
        .expect_err("empty array");
    assert!(matches!(err, ShimError::InvalidArgument { .. }));
}

// ---------------------------------------------------------------------------
// ArgsRecipe::KeyValue
// ---------------------------------------------------------------------------

#[rstest]
fn key_value_builds_one_entry_per_element(services_key: MappingKey) {
    let desired = json!([
        {"name": "nginx", "state": "started"},
        {"enabled": true},
        {"name": "sshd"}
    ]);
    let built = ArgsRecipe::KeyValue
        .build(desired, &services_key, "")
        .expect("array");

    assert_eq!(built.len(), 3);
    assert!(matches!(
        built.first(),
        Some(Ok(Arguments::KeyValue(text))) if text == "name=nginx state=started "
    ));
    assert!(matches!(
        built.get(1),
        Some(Err(ShimError::EmptyArguments { index: 1, .. }))
    ));
    assert!(matches!(
        built.get(2),
        Some(Ok(Arguments::KeyValue(text))) if text == "name=sshd "
    ));
}

#[rstest]
fn key_value_prepends_static_arguments(services_key: MappingKey) {
    let built = ArgsRecipe::KeyValue
        .build(json!([{"name": "bob"}]), &services_key, "append=yes")
        .expect("array");
    assert!(matches!(
        built.first(),
        Some(Ok(Arguments::KeyValue(text))) if text == "append=yes name=bob "
    ));
}

// ---------------------------------------------------------------------------
// ArgsRecipe::ChefResource
// ---------------------------------------------------------------------------

#[rstest]
fn chef_resource_takes_name_and_action(users_key: MappingKey) {
    let desired = json!([{"username": "bob", "action": "create", "uid": 1001}]);
    let built = ArgsRecipe::ChefResource
        .build(desired, &users_key, "")
        .expect("array");

    let Some(Ok(Arguments::Resource {
        name,
        action,
        properties,
    })) = built.first()
    else {
        panic!("expected a resource, got {built:?}");
    };
    assert_eq!(name, "bob");
    assert_eq!(action.as_deref(), Some("create"));
    assert_eq!(
        Value::Object(properties.clone()),
        json!({"username": "bob", "uid": 1001})
    );
}

#[rstest]
fn chef_resource_falls_back_to_name(users_key: MappingKey) {
    let built = ArgsRecipe::ChefResource
        .build(json!([{"name": "alice"}]), &users_key, "")
        .expect("array");
    assert!(matches!(
        built.first(),
        Some(Ok(Arguments::Resource { name, action: None, .. })) if name == "alice"
    ));
}

#[rstest]
fn chef_resource_reports_each_bad_element(users_key: MappingKey) {
    let desired = json!([{"uid": 7}, 42, {}, {"username": "ok"}]);
    let built = ArgsRecipe::ChefResource
        .build(desired, &users_key, "")
        .expect("array");

    assert!(matches!(built.first(), Some(Err(ShimError::InvalidShape { .. }))));
    assert!(matches!(built.get(1), Some(Err(ShimError::InvalidShape { .. }))));
    assert!(matches!(
        built.get(2),
        Some(Err(ShimError::EmptyArguments { index: 2, .. }))
    ));
    assert!(matches!(built.get(3), Some(Ok(_))));
}

// ---------------------------------------------------------------------------
// ArgsRecipe::CloudInitConfig
// ---------------------------------------------------------------------------

#[rstest]
fn cloud_init_batches_the_whole_array(users_key: MappingKey) {
    let desired = json!([{"name": "bob"}, {"name": "alice", "groups": "wheel"}]);
    let built = ArgsRecipe::CloudInitConfig
        .build(desired.clone(), &users_key, "")
        .expect("array");

    assert_eq!(built.len(), 1);
    assert!(matches!(
        built.first(),
        Some(Ok(Arguments::Document(document))) if *document == json!({"users": desired})
    ));
}
