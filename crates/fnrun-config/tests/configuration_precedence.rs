//! Layering tests for configuration loading.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use fnrun_config::{Config, ListenEndpoint, LogFormat};
use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::{fixture, rstest};
use tempfile::TempDir;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct EnvOverride {
    key: &'static str,
    previous: Option<OsString>,
    guard: Option<MutexGuard<'static, ()>>,
}

impl EnvOverride {
    fn set_var(key: &'static str, value: &OsStr) -> Self {
        let guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` under edition 2024; the override is
        // serialised by `ENV_MUTEX` and restored in `Drop`.
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            previous,
            guard: Some(guard),
        }
    }
}

impl Drop for EnvOverride {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
        drop(self.guard.take());
    }
}

struct ConfigFile {
    _dir: TempDir,
    path: PathBuf,
}

#[fixture]
fn config_file() -> ConfigFile {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("fnrun.toml");
    fs::write(
        &path,
        concat!(
            "workers = 3\n",
            "handler = \"hello\"\n",
            "log_format = \"compact\"\n",
            "\n",
            "[listen]\n",
            "host = \"0.0.0.0\"\n",
            "port = 9000\n",
        ),
    )
    .expect("write config file");
    ConfigFile { _dir: dir, path }
}

fn args(extra: &[&OsStr]) -> Vec<OsString> {
    let mut args = vec![OsString::from("fnrund")];
    args.extend(extra.iter().map(|arg| arg.to_os_string()));
    args
}

#[test]
fn defaults_apply_without_sources() {
    let _guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let config = Config::load_from_iter(args(&[])).expect("load defaults");
    assert_eq!(config.listen(), &ListenEndpoint::tcp("127.0.0.1", 8080));
    assert_eq!(config.workers(), 1);
    assert_eq!(config.handler(), "echo");
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[rstest]
fn file_values_override_defaults(config_file: ConfigFile) {
    let _guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let config = Config::load_from_iter(args(&[
        OsStr::new("--config-path"),
        config_file.path.as_os_str(),
    ]))
    .expect("load from file");
    assert_eq!(config.listen(), &ListenEndpoint::tcp("0.0.0.0", 9000));
    assert_eq!(config.workers(), 3);
    assert_eq!(config.handler(), "hello");
    assert_eq!(config.log_format(), LogFormat::Compact);
    assert_eq!(config.capture_level(), "info");
}

#[rstest]
fn cli_flags_override_file(config_file: ConfigFile) {
    let _guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let config = Config::load_from_iter(args(&[
        OsStr::new("--config-path"),
        config_file.path.as_os_str(),
        OsStr::new("--workers"),
        OsStr::new("5"),
        OsStr::new("--listen"),
        OsStr::new("tcp://127.0.0.1:0"),
    ]))
    .expect("load with overrides");
    assert_eq!(config.workers(), 5);
    assert_eq!(config.listen(), &ListenEndpoint::tcp("127.0.0.1", 0));
    assert_eq!(config.handler(), "hello");
}

#[test]
fn environment_overrides_defaults() {
    let _env = EnvOverride::set_var("FNRUN_HANDLER", OsStr::new("hello"));
    let config = Config::load_from_iter(args(&[])).expect("load with env");
    assert_eq!(config.handler(), "hello");
}

#[test]
fn invalid_listen_endpoint_fails_to_load() {
    let _guard = ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let result = Config::load_from_iter(args(&[
        OsStr::new("--listen"),
        OsStr::new("unix:///tmp/fnrun.sock"),
    ]));
    assert!(result.is_err(), "unsupported scheme should be rejected");
}
