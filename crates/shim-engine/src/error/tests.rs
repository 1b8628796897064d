//! Unit tests for engine error types and the status taxonomy.

use std::sync::Arc;

use rstest::rstest;

use super::*;

#[test]
fn mapping_not_found_message_includes_names() {
    let error = ShimError::MappingNotFound {
        component: "Service".into(),
        object: "launchd".into(),
        direction: Direction::Reported,
    };
    let message = error.to_string();
    assert!(message.contains("Service"), "expected component: {message}");
    assert!(message.contains("launchd"), "expected object: {message}");
    assert!(message.contains("reported"), "expected direction: {message}");
}

#[rstest]
#[case::not_found(
    ShimError::MappingNotFound {
        component: "Users".into(),
        object: "x".into(),
        direction: Direction::Desired,
    },
    Status::InvalidArgument
)]
#[case::exit(
    ShimError::NonZeroExit { command: "ansible".into(), status: 2 },
    Status::InvalidArgument
)]
#[case::session(
    ShimError::InvalidSession { operation: "MmiGet".into() },
    Status::InvalidArgument
)]
#[case::disabled(
    ShimError::Disabled { module: "Ansible module".into() },
    Status::PermissionDenied
)]
#[case::unsupported(
    ShimError::Unsupported { module: String::from("ChefInfra"), operation: String::from("get") },
    Status::PermissionDenied
)]
#[case::oom(ShimError::OutOfMemory { bytes: 64 }, Status::OutOfMemory)]
fn errors_map_to_one_status(#[case] error: ShimError, #[case] expected: Status) {
    assert_eq!(error.status(), expected);
}

#[rstest]
#[case::success(Status::Success, 0)]
#[case::einval(Status::InvalidArgument, 22)]
#[case::enomem(Status::OutOfMemory, 12)]
#[case::eperm(Status::PermissionDenied, 1)]
fn status_errno_values(#[case] status: Status, #[case] errno: i32) {
    assert_eq!(status.errno(), errno);
    assert_eq!(status.is_success(), errno == 0);
}

#[test]
fn spawn_error_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    let error = ShimError::Spawn {
        command: "sh -c true".into(),
        source: Arc::new(std::io::Error::other("boom")),
    };
    assert_send_sync::<ShimError>();
    assert!(error.to_string().contains("sh -c true"));
}

#[test]
fn dependency_error_keeps_the_cause() {
    let error = ShimError::Dependency {
        check: "Python executable 'python3'".into(),
        source: Box::new(ShimError::NonZeroExit {
            command: "which python3".into(),
            status: 1,
        }),
    };
    assert!(error.to_string().contains("python3"));
    let source = std::error::Error::source(&error).map(ToString::to_string);
    assert_eq!(
        source.as_deref(),
        Some("'which python3' exited with status 1")
    );
}
