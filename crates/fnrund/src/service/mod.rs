//! Persistent HTTP binding.
//!
//! The service binds one HTTP listener and runs a fixed pool of worker
//! threads that pull requests from it. `GET /healthz` answers the liveness
//! probe; every other request is decoded, invoked, and answered with a
//! response envelope.

mod errors;
mod listener;
mod sink;
#[cfg(test)]
pub(crate) mod test_utils;

pub use self::errors::ServiceError;
pub use self::listener::{HttpService, ServiceHandle};
pub use self::sink::{HEALTH_PATH, InvocationSink, Route};

/// Tracing target for transport events.
pub const SERVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service");
