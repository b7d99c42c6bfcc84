//! Error types for the HTTP binding.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Fatal errors raised while binding or running the HTTP service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The configured host did not resolve.
    #[error("failed to resolve listen address {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },

    /// The configured host resolved to nothing.
    #[error("no addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },

    /// Binding the HTTP listener failed.
    #[error("failed to bind HTTP listener at {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying failure reported by the HTTP server.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The service was asked to start without any workers.
    #[error("at least one worker is required")]
    NoWorkers,

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker {index}: {source}")]
    Spawn {
        /// Worker number.
        index: usize,
        /// Spawn failure.
        #[source]
        source: io::Error,
    },

    /// A worker thread panicked outside a handler.
    #[error("service worker panicked")]
    WorkerPanic,
}
