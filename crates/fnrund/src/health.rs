//! Structured reporting of lifecycle events.

use std::net::SocketAddr;

use fnrun_config::Config;

use crate::bootstrap::BootstrapError;

/// Tracing target for lifecycle events.
pub const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for startup and shutdown milestones.
pub trait HealthReporter: Send + Sync {
    /// Configuration loading is about to begin.
    fn bootstrap_starting(&self);

    /// Configuration, telemetry, and handler resolution all succeeded.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Bootstrap stopped at `error`.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// The service is accepting requests on `addr`.
    fn service_ready(&self, addr: SocketAddr, workers: usize);

    /// A shutdown signal arrived and the service is stopping.
    fn service_stopping(&self);
}

/// Reporter that records lifecycle events with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting runtime bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            handler = config.handler(),
            listen = %config.listen(),
            capture_level = config.capture_level(),
            log_format = %config.log_format(),
            "runtime bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "runtime bootstrap failed"
        );
    }

    fn service_ready(&self, addr: SocketAddr, workers: usize) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_ready",
            addr = %addr,
            workers,
            "service ready"
        );
    }

    fn service_stopping(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_stopping",
            "service stopping"
        );
    }
}
