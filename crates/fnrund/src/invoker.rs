//! Runs the handler once and maps every way it can end to an [`Outcome`].

use std::panic::{self, AssertUnwindSafe};

use tracing::error;
use tracing::level_filters::LevelFilter;

use crate::capture::{self, panic_message};
use crate::encoder::EncodeError;
use crate::envelope::{DiagnosticLog, InvocationContext, InvocationPayload, Outcome};
use crate::handler::{CallError, SharedHandler};

/// Tracing target for invocation diagnostics.
pub const INVOKER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::invoker");

/// Calls `handler` exactly once with `context` and `payload`.
///
/// Errors, panics, and unserialisable results all become
/// [`Outcome::Failure`]; nothing escapes this boundary. The error's full
/// cause chain is recorded as an `error` event so that an open capture scope
/// picks it up, while the outcome carries only the top-level message.
pub fn invoke(
    handler: &SharedHandler,
    context: &InvocationContext,
    payload: InvocationPayload,
) -> Outcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| handler.call_json(context, payload)));
    match result {
        Ok(Ok(value)) => Outcome::Success(value),
        Ok(Err(CallError::Handler(failure))) => {
            error!(
                target: INVOKER_TARGET,
                handler = handler.name(),
                "{failure:#}"
            );
            Outcome::failure(failure.to_string())
        }
        Ok(Err(CallError::Encode(source))) => {
            let detail = source.to_string();
            let failure = EncodeError::Result(source);
            error!(
                target: INVOKER_TARGET,
                handler = handler.name(),
                detail = %detail,
                "{failure}"
            );
            Outcome::failure(failure.to_string())
        }
        Err(panic_payload) => {
            let message = panic_message(panic_payload.as_ref()).to_owned();
            Outcome::failure(message)
        }
    }
}

/// Completed invocation with the diagnostics captured while it ran.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// What the handler produced.
    pub outcome: Outcome,
    /// Lines written during the invocation window.
    pub logs: DiagnosticLog,
}

/// Pairs the resolved handler with the capture level used for each call.
#[derive(Debug, Clone)]
pub struct Invoker {
    handler: SharedHandler,
    capture_level: LevelFilter,
}

impl Invoker {
    /// Builds an invoker for `handler`.
    #[must_use]
    pub const fn new(handler: SharedHandler, capture_level: LevelFilter) -> Self {
        Self {
            handler,
            capture_level,
        }
    }

    /// The wrapped handler.
    #[must_use]
    pub const fn handler(&self) -> &SharedHandler {
        &self.handler
    }

    /// Runs one invocation inside its own capture scope.
    #[must_use]
    pub fn run(&self, context: &InvocationContext, payload: InvocationPayload) -> Invocation {
        let (outcome, logs) = capture::scoped(self.capture_level, || {
            invoke(&self.handler, context, payload)
        });
        Invocation { outcome, logs }
    }
}
