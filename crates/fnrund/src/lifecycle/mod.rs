//! Startup and signal-driven shutdown of the persistent service.

mod errors;
mod shutdown;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::handler::HandlerRegistry;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::service::HttpService;

pub use self::errors::LaunchError;
pub use self::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

/// Tracing target for lifecycle events.
pub const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Runs the service with production collaborators and built-in handlers.
///
/// # Errors
///
/// Returns [`LaunchError`] when startup fails or signal handlers cannot be
/// installed.
pub fn run_service() -> Result<(), LaunchError> {
    run_service_with(
        &SystemConfigLoader,
        &StructuredHealthReporter::new(),
        &HandlerRegistry::with_builtins(),
        &SystemShutdownSignal,
    )
}

/// Runs the service with injected collaborators.
///
/// Blocks until `shutdown` returns, then stops accepting requests and returns
/// without waiting for in-flight invocations.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, bind, worker startup, or the
/// shutdown listener fails.
pub fn run_service_with<S>(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
    registry: &HandlerRegistry,
    shutdown: &S,
) -> Result<(), LaunchError>
where
    S: ShutdownSignal + ?Sized,
{
    let runtime = bootstrap_with(loader, reporter, registry)?;
    let config = runtime.config();
    info!(
        target: LIFECYCLE_TARGET,
        listen = %config.listen(),
        handler = runtime.invoker().handler().name(),
        "starting service"
    );
    let service = HttpService::bind(config.listen())?;
    let handle = service.start(runtime.sink(), config.workers())?;
    reporter.service_ready(handle.local_addr(), config.workers());

    let waited = shutdown.wait();
    reporter.service_stopping();
    handle.shutdown();
    waited?;
    info!(target: LIFECYCLE_TARGET, "shutdown sequence completed");
    Ok(())
}
