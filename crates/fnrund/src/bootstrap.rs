//! Startup sequence shared by both binaries.
//!
//! Bootstrap loads and validates configuration, installs telemetry, parses the
//! capture level, and resolves the configured handler. Every failure here is
//! fatal; nothing after bootstrap can stop the process.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::level_filters::{LevelFilter, ParseLevelFilterError};

use fnrun_config::{Config, ConfigError};

use crate::capture;
use crate::handler::{HandlerRegistry, UnknownHandlerError};
use crate::health::HealthReporter;
use crate::invoker::Invoker;
use crate::service::InvocationSink;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the runtime configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the configuration.
    ///
    /// # Errors
    ///
    /// Returns the layered loader's error when any source is invalid.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that reads defaults, files, environment, and process arguments.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but is not usable.
    #[error("invalid configuration: {source}")]
    Validation {
        /// Violated constraint.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// `capture_level` is not a level name.
    #[error("invalid capture level '{value}': {source}")]
    CaptureLevel {
        /// Configured value.
        value: String,
        /// Parser error.
        #[source]
        source: ParseLevelFilterError,
    },
    /// The configured handler is not registered.
    #[error("failed to resolve handler: {source}")]
    Handler {
        /// Lookup failure.
        #[source]
        source: UnknownHandlerError,
    },
}

/// Everything a transport binding needs once startup has succeeded.
#[derive(Debug)]
pub struct Runtime {
    config: Config,
    invoker: Invoker,
    telemetry: TelemetryHandle,
}

impl Runtime {
    /// Resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Invoker wrapping the resolved handler.
    #[must_use]
    pub const fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Telemetry handle, mostly useful in tests.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Builds the HTTP sink for this runtime.
    #[must_use]
    pub fn sink(&self) -> InvocationSink {
        InvocationSink::new(self.invoker.clone(), self.config.max_request_bytes())
    }
}

/// Runs the startup sequence with the supplied collaborators.
///
/// # Errors
///
/// Returns the first [`BootstrapError`] encountered; `reporter` observes it
/// before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
    registry: &HandlerRegistry,
) -> Result<Runtime, BootstrapError> {
    reporter.bootstrap_starting();
    match prepare(loader, registry) {
        Ok(runtime) => {
            reporter.bootstrap_succeeded(runtime.config());
            Ok(runtime)
        }
        Err(error) => {
            reporter.bootstrap_failed(&error);
            Err(error)
        }
    }
}

fn prepare(
    loader: &dyn ConfigLoader,
    registry: &HandlerRegistry,
) -> Result<Runtime, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    config
        .validate()
        .map_err(|source| BootstrapError::Validation { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let capture_level = parse_capture_level(config.capture_level())?;
    let handler = registry
        .resolve(config.handler())
        .map_err(|source| BootstrapError::Handler { source })?;
    capture::install_panic_hook();
    Ok(Runtime {
        invoker: Invoker::new(handler, capture_level),
        config,
        telemetry,
    })
}

fn parse_capture_level(value: &str) -> Result<LevelFilter, BootstrapError> {
    value
        .trim()
        .parse()
        .map_err(|source| BootstrapError::CaptureLevel {
            value: value.to_owned(),
            source,
        })
}
