//! Shared configuration for the fnrun binaries.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a TOML
//! configuration file (`--config-path` or `FNRUN_CONFIG_PATH`), then `FNRUN_*`
//! environment variables, then command-line flags. Both the persistent HTTP
//! service and the one-shot batch binary read the same [`Config`].

mod defaults;
mod endpoint;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_CAPTURE_LEVEL, DEFAULT_HANDLER, DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT,
    DEFAULT_LOG_FILTER, DEFAULT_MAX_REQUEST_BYTES, DEFAULT_WORKERS, default_capture_level_string,
    default_handler_string, default_listen_endpoint, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use endpoint::{EndpointParseError, ListenEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

/// Runtime configuration for the invocation server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "FNRUN")]
pub struct Config {
    /// Endpoint the HTTP service binds to.
    #[ortho_config(default = default_listen_endpoint())]
    pub listen: ListenEndpoint,
    /// Number of worker threads pulling requests off the listener.
    #[ortho_config(default = DEFAULT_WORKERS)]
    pub workers: usize,
    /// Registry name of the handler resolved at startup.
    #[ortho_config(default = default_handler_string())]
    pub handler: String,
    /// Minimum level recorded into each invocation's diagnostic log.
    #[ortho_config(default = default_capture_level_string())]
    pub capture_level: String,
    /// Largest accepted request body in bytes.
    #[ortho_config(default = DEFAULT_MAX_REQUEST_BYTES)]
    pub max_request_bytes: usize,
    /// `tracing` filter expression for process telemetry.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Telemetry output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            workers: DEFAULT_WORKERS,
            handler: default_handler_string(),
            capture_level: default_capture_level_string(),
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint the HTTP service binds to.
    #[must_use]
    pub const fn listen(&self) -> &ListenEndpoint {
        &self.listen
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Registry name of the configured handler.
    #[must_use]
    pub const fn handler(&self) -> &str {
        self.handler.as_str()
    }

    /// Minimum captured diagnostic level, as configured.
    #[must_use]
    pub const fn capture_level(&self) -> &str {
        self.capture_level.as_str()
    }

    /// Request body limit in bytes.
    #[must_use]
    pub const fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    /// Telemetry filter expression.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Telemetry output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Checks invariants the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the worker count or request limit is zero,
    /// or when the handler name or capture level is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::NoRequestBudget);
        }
        if self.handler.trim().is_empty() {
            return Err(ConfigError::MissingHandler);
        }
        if self.capture_level.trim().is_empty() {
            return Err(ConfigError::MissingCaptureLevel);
        }
        Ok(())
    }
}

/// Semantic configuration errors detected after loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `workers` was zero.
    #[error("at least one worker thread is required")]
    NoWorkers,
    /// `max_request_bytes` was zero.
    #[error("max_request_bytes must be greater than zero")]
    NoRequestBudget,
    /// `handler` was empty.
    #[error("handler name must not be empty")]
    MissingHandler,
    /// `capture_level` was empty.
    #[error("capture_level must name a level such as info or debug")]
    MissingCaptureLevel,
}
