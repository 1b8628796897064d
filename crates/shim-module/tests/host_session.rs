//! End-to-end tests driving a module over the line protocol.
//!
//! The system shell is replaced by stubs, so these tests run without any
//! configuration-management tool installed.

#![expect(
    clippy::expect_used,
    reason = "test code uses expect for clarity and assertions"
)]

use std::cell::RefCell;
use std::io::Cursor;

use rstest::{fixture, rstest};
use serde_json::json;
use shim_config::{Backend, Config};
use shim_engine::exec::CommandRunner;
use shim_engine::{ShimError, Status};
use shim_module::HostResponse;
use shim_module::host::run_with_runner;

/// Shell stand-in: dependency checks pass, Ansible prints one-line output,
/// anything listed in `failing` exits non-zero.
#[derive(Default)]
struct StubShell {
    failing: Vec<&'static str>,
}

impl StubShell {
    fn failing_on(patterns: &[&'static str]) -> Self {
        Self {
            failing: patterns.to_vec(),
        }
    }
}

impl CommandRunner for StubShell {
    fn run(&self, command: &str) -> Result<String, ShimError> {
        if self.failing.iter().any(|pattern| command.contains(pattern)) {
            return Err(ShimError::NonZeroExit {
                command: command.to_owned(),
                status: 1,
            });
        }
        if command.contains("service_facts") {
            let facts = json!({"ansible_facts": {"services": {
                "nginx.service": {"name": "nginx", "source": "systemd", "state": "running"},
                "cups.service": {"name": "cups", "source": "systemd", "state": "stopped"}
            }}});
            return Ok(format!("localhost | SUCCESS => {facts}"));
        }
        if command.contains("--module-name") {
            return Ok(String::from("localhost | CHANGED => {\"changed\": true}"));
        }
        Ok(String::new())
    }
}

#[fixture]
fn config() -> Config {
    let scratch = std::env::temp_dir();
    Config {
        scratch_directory: camino::Utf8PathBuf::from_path_buf(scratch).unwrap_or_default(),
        ..Config::default()
    }
}

fn exchange(
    config: &Config,
    runner: StubShell,
    requests: &[serde_json::Value],
) -> Vec<HostResponse> {
    let input: String = requests
        .iter()
        .map(|request| format!("{request}\n"))
        .collect();
    let mut output = Vec::new();
    let answered = run_with_runner(config, "integration", runner, Cursor::new(input), &mut output)
        .expect("streams stay healthy");
    assert_eq!(answered, requests.len());

    String::from_utf8(output)
        .expect("utf-8 output")
        .lines()
        .map(|line| serde_json::from_str(line).expect("response json"))
        .collect()
}

#[rstest]
fn enabled_module_serves_a_full_session(config: Config) {
    let responses = exchange(
        &config,
        StubShell::default(),
        &[
            json!({"op": "info"}),
            json!({"op": "get", "component": "Service", "object": "systemd"}),
            json!({
                "op": "set",
                "component": "Service",
                "object": "desiredServices",
                "payload": "[{\"name\": \"nginx\", \"state\": \"restarted\"}]"
            }),
        ],
    );

    let statuses: Vec<Status> = responses.iter().map(|response| response.status).collect();
    assert_eq!(statuses, [Status::Success, Status::Success, Status::Success]);
    assert_eq!(
        responses.get(1).and_then(|response| response.payload.as_deref()),
        Some("[\"nginx\"]")
    );
}

#[rstest]
fn failed_probe_disables_the_module(config: Config) {
    let responses = exchange(
        &config,
        StubShell::failing_on(&["command -v python3"]),
        &[
            json!({"op": "get", "component": "Service", "object": "systemd"}),
            json!({"op": "set", "component": "Users", "object": "desiredUsers", "payload": "[]"}),
            json!({"op": "info"}),
        ],
    );

    let summary: Vec<(Status, i32)> = responses
        .iter()
        .map(|response| (response.status, response.errno))
        .collect();
    assert_eq!(
        summary,
        [
            (Status::PermissionDenied, 1),
            (Status::PermissionDenied, 1),
            (Status::Success, 0)
        ]
    );
}

#[rstest]
fn negotiated_ceiling_comes_from_configuration(config: Config) {
    let limited = Config {
        max_payload_bytes: 3,
        ..config
    };
    let responses = exchange(
        &limited,
        StubShell::default(),
        &[json!({"op": "get", "component": "Service", "object": "systemd"})],
    );

    assert_eq!(
        responses.first().and_then(|response| response.payload.as_deref()),
        Some("[\"n")
    );
}

#[rstest]
fn tool_failures_differ_between_reads_and_writes(config: Config) {
    let responses = exchange(
        &config,
        StubShell::failing_on(&["--module-name"]),
        &[
            json!({"op": "get", "component": "Users", "object": "users"}),
            json!({
                "op": "set",
                "component": "Users",
                "object": "desiredUsers",
                "payload": "[{\"name\": \"ops\"}]"
            }),
        ],
    );

    assert_eq!(
        responses,
        [
            HostResponse {
                status: Status::Success,
                errno: 0,
                payload: Some(String::new()),
            },
            HostResponse {
                status: Status::InvalidArgument,
                errno: 22,
                payload: None,
            },
        ]
    );
}

#[test]
fn chef_module_writes_resources_through_a_scratch_file() {
    let scratch = tempfile::tempdir().expect("scratch dir");
    let config = Config {
        backend: Backend::Chef,
        scratch_directory: camino::Utf8PathBuf::from_path_buf(scratch.path().to_path_buf())
            .expect("utf-8 scratch dir"),
        ..Config::default()
    };
    let runner = ChefShell::default();

    let mut output = Vec::new();
    let request = json!({
        "op": "set",
        "component": "Users",
        "object": "desiredUsers",
        "payload": "[{\"username\": \"ops\", \"action\": \"create\", \"shell\": \"/bin/bash\"}]"
    });
    run_with_runner(
        &config,
        "integration",
        &runner,
        Cursor::new(format!("{request}\n")),
        &mut output,
    )
    .expect("served");

    let response: HostResponse =
        serde_json::from_slice(output.trim_ascii()).expect("response json");
    assert_eq!(response.status, Status::Success);
    let documents = runner.documents.borrow();
    let document = documents.first().expect("chef helper ran");
    assert_eq!(document.get("resource_class"), Some(&json!("user")));
    assert_eq!(document.get("resource_name"), Some(&json!("ops")));
    assert_eq!(document.get("action"), Some(&json!("create")));
    assert_eq!(document.pointer("/properties/shell"), Some(&json!("/bin/bash")));
    assert!(document.pointer("/properties/action").is_none());
}

/// Shell stand-in for Chef: the gem check prints `true` and the helper's
/// redirected scratch file is captured.
#[derive(Default)]
struct ChefShell {
    documents: RefCell<Vec<serde_json::Value>>,
}

impl CommandRunner for &ChefShell {
    fn run(&self, command: &str) -> Result<String, ShimError> {
        if command.starts_with("gem list") {
            return Ok(String::from("true\n"));
        }
        if let Some((_, redirect)) = command.rsplit_once(" < ") {
            let path = redirect.trim().trim_matches('\'');
            let text = std::fs::read_to_string(path).map_err(|err| ShimError::InvalidArgument {
                message: err.to_string(),
            })?;
            let document = serde_json::from_str(&text).map_err(|err| ShimError::parse(path, err))?;
            self.documents.borrow_mut().push(document);
        }
        Ok(String::new())
    }
}
