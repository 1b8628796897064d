//! Crate-level test doubles and behavioural tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use mockall::mock;
use serde_json::json;
use shim_config::Backend;

use crate::error::ShimError;
use crate::exec::{Arguments, CommandRunner, Executor, Invocation};
use crate::mapping::MappingTable;
use crate::router::Router;


mock! {
    pub Runner {}
    impl CommandRunner for Runner {
        fn run(&self, command: &str) -> Result<String, ShimError>;
    }
}

/// Executor that replays queued outputs and records every invocation.
///
/// When the queue runs dry every further call fails with a non-zero exit.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    outputs: RefCell<VecDeque<Result<String, ShimError>>>,
    calls: RefCell<Vec<(String, Arguments)>>,
}

impl RecordingExecutor {
    /// Creates an executor that answers each call with the next output.
    pub fn with_outputs(outputs: impl IntoIterator<Item = Result<String, ShimError>>) -> Self {
        Self {
            outputs: RefCell::new(outputs.into_iter().collect()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Returns `(qualified module, arguments)` for every call so far.
    pub fn calls(&self) -> Vec<(String, Arguments)> {
        self.calls.borrow().clone()
    }
}

impl Executor for RecordingExecutor {
    fn execute(&self, invocation: &Invocation<'_>) -> Result<String, ShimError> {
        let module = invocation.target().qualified_module();
        self.calls
            .borrow_mut()
            .push((module.clone(), invocation.arguments().clone()));
        self.outputs
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(ShimError::NonZeroExit {
                command: module,
                status: 1,
            }))
    }
}

/// Builds a successful Ansible one-line result body.
pub fn changed() -> Result<String, ShimError> {
    Ok(json!({"changed": true}).to_string())
}

#[test]
fn end_to_end_service_round_trip() {
    let facts = json!({"ansible_facts": {"services": {
        "nginx.service": {"name": "nginx", "source": "systemd", "state": "running"},
        "x.service": {"name": "x", "source": "systemd", "state": "stopped"}
    }}});
    let executor = RecordingExecutor::with_outputs([Ok(facts.to_string()), changed()]);
    let router = Router::new(MappingTable::builtin(Backend::Ansible), executor);

    let reported = router.reported("Service", "systemd").expect("reported");
    assert_eq!(reported, json!(["nginx"]));

    router
        .desired(
            "Service",
            "desiredServices",
            r#"[{"name": "nginx", "state": "stopped"}]"#,
        )
        .expect("desired");

    let calls = router.executor().calls();
    assert_eq!(
        calls,
        vec![
            (
                String::from("ansible.builtin.service_facts"),
                Arguments::KeyValue(String::new())
            ),
            (
                String::from("ansible.builtin.service"),
                Arguments::KeyValue(String::from("name=nginx state=stopped "))
            ),
        ]
    );
}
