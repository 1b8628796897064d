//! Layering of defaults, configuration file, environment and flags.

#![expect(
    clippy::expect_used,
    reason = "test code uses expect for clarity and assertions"
)]

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use shim_config::{Backend, Config, LogFormat};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const SHIM_KEYS: &[&str] = &[
    "SHIM_CONFIG_PATH",
    "SHIM_FULL_LOGGING",
    "SHIM_LOG_FILTER",
    "SHIM_LOG_FORMAT",
    "SHIM_LOG_FILE",
    "SHIM_BACKEND",
    "SHIM_MAX_PAYLOAD_BYTES",
    "SHIM_CLIENT_NAME",
];

/// Serialises access to the process environment and restores every
/// variable it touched when dropped.
struct EnvScope {
    previous: Vec<(&'static str, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvScope {
    fn isolated() -> Self {
        let guard = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
        let mut scope = Self {
            previous: Vec::new(),
            _guard: guard,
        };
        for key in SHIM_KEYS {
            scope.remember(key);
            // Environment mutation is `unsafe` in edition 2024; the mutex
            // keeps tests in this binary from racing on it.
            unsafe { std::env::remove_var(key) };
        }
        scope
    }

    fn set(&mut self, key: &'static str, value: impl Into<OsString>) {
        self.remember(key);
        unsafe { std::env::set_var(key, value.into()) };
    }

    fn remember(&mut self, key: &'static str) {
        if self.previous.iter().all(|(seen, _)| *seen != key) {
            self.previous.push((key, std::env::var_os(key)));
        }
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        while let Some((key, value)) = self.previous.pop() {
            match value {
                Some(previous) => unsafe { std::env::set_var(key, previous) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

fn write_config(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("shim.json");
    fs::write(&path, text).expect("write configuration");
    path
}

fn args_with_file(path: &Path, extra: &[&str]) -> Vec<OsString> {
    let mut args = vec![
        OsString::from("mmi-shim"),
        OsString::from("--config-path"),
        path.as_os_str().to_owned(),
    ];
    args.extend(extra.iter().map(OsString::from));
    args
}

#[test]
fn no_layers_yield_defaults() {
    let _env = EnvScope::isolated();
    let config = Config::resolve(["mmi-shim"]).expect("load defaults");
    assert_eq!(config, Config::default());
}

#[rstest]
fn file_values_are_loaded(temp_dir: TempDir) {
    let _env = EnvScope::isolated();
    let path = write_config(
        &temp_dir,
        r#"{
            "full_logging": true,
            "log_format": "compact",
            "log_file": "/var/log/osconfig_shim.log",
            "backend": "cloud-init",
            "cloud_init_distro": "debian",
            "max_payload_bytes": 2048
        }"#,
    );

    let config = Config::resolve(args_with_file(&path, &[])).expect("load config");

    assert!(config.full_logging);
    assert_eq!(config.log_format(), LogFormat::Compact);
    assert_eq!(
        config.log_file().map(|file| file.as_str()),
        Some("/var/log/osconfig_shim.log")
    );
    assert_eq!(config.backend, Backend::CloudInit);
    assert_eq!(config.cloud_init_distro, "debian");
    assert_eq!(config.max_payload_bytes, 2048);
}

#[rstest]
fn environment_overrides_the_file(temp_dir: TempDir) {
    let mut env = EnvScope::isolated();
    let path = write_config(&temp_dir, r#"{"log_filter": "warn", "max_payload_bytes": 10}"#);
    env.set("SHIM_LOG_FILTER", "debug");
    env.set("SHIM_MAX_PAYLOAD_BYTES", "4096");
    env.set("SHIM_BACKEND", "chef");

    let config = Config::resolve(args_with_file(&path, &[])).expect("load config");

    assert_eq!(config.log_filter(), "debug");
    assert_eq!(config.max_payload_bytes, 4096);
    assert_eq!(config.backend, Backend::Chef);
}

#[rstest]
fn flags_override_the_environment(temp_dir: TempDir) {
    let mut env = EnvScope::isolated();
    let path = write_config(&temp_dir, r#"{"backend": "chef", "client_name": "from-file"}"#);
    env.set("SHIM_BACKEND", "ansible");
    env.set("SHIM_MAX_PAYLOAD_BYTES", "10");

    let config = Config::resolve(args_with_file(
        &path,
        &[
            "--backend",
            "cloud-init",
            "--max-payload-bytes",
            "512",
            "--client-name",
            "osconfig",
        ],
    ))
    .expect("load config");

    assert_eq!(config.backend, Backend::CloudInit);
    assert_eq!(config.max_payload_bytes, 512);
    assert_eq!(config.client_name, "osconfig");
}

#[rstest]
fn environment_can_name_the_file(temp_dir: TempDir) {
    let mut env = EnvScope::isolated();
    let path = write_config(&temp_dir, r#"{"cloud_init_distro": "fedora"}"#);
    env.set("SHIM_CONFIG_PATH", path.into_os_string());

    let config = Config::resolve(["mmi-shim"]).expect("load config");

    assert_eq!(config.cloud_init_distro, "fedora");
}

#[rstest]
fn malformed_file_fails_to_load(temp_dir: TempDir) {
    let _env = EnvScope::isolated();
    let path = write_config(&temp_dir, "{ not json");

    let err = Config::resolve(args_with_file(&path, &[])).expect_err("malformed file");

    assert!(err.to_string().contains("failed to load configuration"));
    assert!(err.usage().is_none());
}

#[test]
fn invalid_environment_value_fails_to_load() {
    let mut env = EnvScope::isolated();
    env.set("SHIM_BACKEND", "puppet");

    let err = Config::resolve(["mmi-shim"]).expect_err("unknown backend");
    assert!(err.usage().is_none());
}

#[rstest]
#[case::unknown_flag(&["mmi-shim", "--verbose"], true)]
#[case::help(&["mmi-shim", "--help"], false)]
fn argument_parsing_reports_usage(#[case] args: &[&str], #[case] failure: bool) {
    let _env = EnvScope::isolated();

    let err = Config::resolve(args.iter().copied()).expect_err("parsing stops");
    let (message, is_failure) = err.usage().expect("usage message");

    assert!(!message.is_empty());
    assert_eq!(is_failure, failure);
}
