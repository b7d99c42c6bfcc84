//! Test doubles shared by the behavioural and unit suites.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, Condvar, Mutex};

use ortho_config::{OrthoConfig, OrthoError};

use fnrun_config::{Config, ListenEndpoint};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::health::HealthReporter;
use crate::lifecycle::{ShutdownError, ShutdownSignal};

/// Lifecycle events observed during a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ServiceReady(SocketAddr),
    ServiceStopping,
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    pub(crate) fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub(crate) fn ready_addr(&self) -> Option<SocketAddr> {
        self.events().into_iter().find_map(|event| match event {
            HealthEvent::ServiceReady(addr) => Some(addr),
            _ => None,
        })
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn service_ready(&self, addr: SocketAddr, _workers: usize) {
        self.record(HealthEvent::ServiceReady(addr));
    }

    fn service_stopping(&self) {
        self.record(HealthEvent::ServiceStopping);
    }
}

/// Loader serving a loopback configuration on an ephemeral port.
#[derive(Debug, Clone)]
pub(crate) struct LoopbackConfigLoader {
    config: Config,
}

impl LoopbackConfigLoader {
    pub(crate) fn new(handler: &str) -> Self {
        Self {
            config: Config {
                listen: ListenEndpoint::tcp("127.0.0.1", 0),
                handler: handler.to_owned(),
                ..Config::default()
            },
        }
    }

    pub(crate) fn listening_on(mut self, endpoint: ListenEndpoint) -> Self {
        self.config.listen = endpoint;
        self
    }
}

impl ConfigLoader for LoopbackConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that fails by passing an unsupported listen endpoint.
pub(crate) struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("fnrund"),
            OsString::from("--listen"),
            OsString::from("unix:///tmp/fnrund.sock"),
        ])
    }
}

/// Shutdown signal released by the test.
#[derive(Clone)]
pub(crate) struct TestShutdownSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl TestShutdownSignal {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    pub(crate) fn trigger(&self) {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        *triggered = true;
        cvar.notify_all();
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let (lock, cvar) = &*self.inner;
        let mut triggered = lock.lock().expect("shutdown mutex poisoned");
        while !*triggered {
            triggered = cvar
                .wait(triggered)
                .expect("shutdown mutex poisoned during wait");
        }
        Ok(())
    }
}

/// Step parameter wrapped in single quotes in feature files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Quoted(String);

impl Quoted {
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Quoted {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().trim_matches('\'').to_owned()))
    }
}
