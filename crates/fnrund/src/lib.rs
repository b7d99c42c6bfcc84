//! Function-invocation runtime.
//!
//! `fnrund` turns a single handler routine into a callable service. Each
//! invocation is decoded from a request envelope, run under a diagnostic
//! capture scope, and answered with an envelope that keeps the handler's
//! result, its failure message, and the lines it logged apart:
//!
//! ```json
//! {"context":{"error":null,"logs":["INFO cloning template"]},"payload":{"vm":"web-01"}}
//! ```
//!
//! Two bindings share the same core. The persistent HTTP service
//! ([`run_service`]) serves any number of invocations from a pool of worker
//! threads and answers `GET /healthz` for liveness probes. The batch binding
//! ([`batch::run`]) reads one request from stdin and writes the raw result to
//! stdout.
//!
//! Capture is thread-local, so invocations running on different workers never
//! observe each other's diagnostics, and a handler that fails or panics is
//! reported through the envelope instead of taking the worker down.

pub mod batch;
mod bootstrap;
pub mod capture;
pub mod encoder;
pub mod envelope;
pub mod handler;
mod health;
mod invoker;
mod lifecycle;
pub mod service;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Runtime, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use handler::{Handler, HandlerRegistry, SharedHandler, handler_fn};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use invoker::{Invocation, Invoker, invoke};
pub use lifecycle::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_service,
    run_service_with,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
