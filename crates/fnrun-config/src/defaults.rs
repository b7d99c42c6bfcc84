use crate::endpoint::ListenEndpoint;
use crate::logging::LogFormat;

/// Host the HTTP service binds to by default.
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";

/// Port the HTTP service binds to by default.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Number of worker threads serving invocations.
pub const DEFAULT_WORKERS: usize = 1;

/// Handler resolved from the registry when none is configured.
pub const DEFAULT_HANDLER: &str = "echo";

/// Minimum level recorded into an invocation's diagnostic log.
pub const DEFAULT_CAPTURE_LEVEL: &str = "info";

/// Largest request body accepted by the HTTP service (1 MiB).
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default listen endpoint for the HTTP service.
#[must_use]
pub fn default_listen_endpoint() -> ListenEndpoint {
    ListenEndpoint::tcp(DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT)
}

/// Owned handler name used where allocation is required (e.g. serde).
#[must_use]
pub fn default_handler_string() -> String {
    DEFAULT_HANDLER.to_owned()
}

/// Owned capture level used where allocation is required.
#[must_use]
pub fn default_capture_level_string() -> String {
    DEFAULT_CAPTURE_LEVEL.to_owned()
}

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
