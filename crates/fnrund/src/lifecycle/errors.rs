//! Error surface of the lifecycle controller.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::service::ServiceError;

use super::shutdown::ShutdownError;

/// Fatal errors raised while running the persistent service.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Startup failed before the listener was bound.
    #[error("runtime bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// Binding or starting the HTTP service failed.
    #[error("http service failed: {source}")]
    Service {
        /// Underlying transport error.
        #[source]
        source: ServiceError,
    },
    /// Waiting for a shutdown signal failed.
    #[error("failed to await shutdown signal: {source}")]
    Shutdown {
        /// Underlying signal error.
        #[source]
        source: ShutdownError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ServiceError> for LaunchError {
    fn from(source: ServiceError) -> Self {
        Self::Service { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}
