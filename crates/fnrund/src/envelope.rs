//! Invocation envelope data model.
//!
//! Requests carry an opaque caller context and an arbitrary payload. Responses
//! separate the handler's result from its failure message and the diagnostic
//! lines captured while it ran:
//!
//! ```json
//! {"context":{"error":null,"logs":[]},"payload":{"myField":"Hello, Jon from Winterfell"}}
//! ```
//!
//! The batch binding reads the same context but takes its business input from
//! an `input` key, see [`BatchRequest`].

use std::io;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Arbitrary business input forwarded to the handler untouched.
pub type InvocationPayload = Value;

/// Caller-supplied context holding resolved secrets, bindings, and metadata.
///
/// The runtime never inspects it; absence decodes to JSON `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationContext(Value);

impl InvocationContext {
    /// Wraps a raw JSON value.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrows the raw value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Looks up a top-level key when the context is an object.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Unwraps the raw value.
    #[must_use]
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for InvocationContext {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Errors raised while turning raw request bytes into a request envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is not valid JSON.
    #[error("malformed request: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The body parsed but is not a JSON object.
    #[error("malformed request: expected a JSON object, found {found}")]
    NotAnObject {
        /// Kind of JSON value found instead.
        found: &'static str,
    },

    /// The body exceeded the configured byte budget.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    TooLarge {
        /// Observed or declared body size.
        size: usize,
        /// Configured limit.
        max_size: usize,
    },

    /// Reading the body from the transport failed.
    #[error("failed to read request body: {0}")]
    Read(#[from] io::Error),
}

/// Request accepted by the persistent HTTP service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InvocationRequest {
    /// Opaque caller context.
    #[serde(default)]
    pub context: InvocationContext,
    /// Business input.
    #[serde(default)]
    pub payload: InvocationPayload,
}

impl InvocationRequest {
    /// Decodes a request body.
    ///
    /// An empty or whitespace-only body yields a request whose context and
    /// payload are both absent.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the body is not a JSON object.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        decode_object(body)
    }
}

/// Request accepted by the one-shot batch binding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BatchRequest {
    /// Opaque caller context.
    #[serde(default)]
    pub context: InvocationContext,
    /// Business input, keyed `input` rather than `payload`.
    #[serde(default)]
    pub input: InvocationPayload,
}

impl BatchRequest {
    /// Decodes the JSON object read from standard input.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the input is not a JSON object.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        decode_object(body)
    }
}

fn decode_object<T>(body: &[u8]) -> Result<T, DecodeError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: Value = serde_json::from_slice(body)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject {
            found: json_kind(&value),
        });
    }
    Ok(serde_json::from_value(value)?)
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Failure reported through the envelope's error channel.
///
/// Serialised as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationError {
    message: String,
}

impl InvocationError {
    /// Builds an error carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&DecodeError> for InvocationError {
    fn from(error: &DecodeError) -> Self {
        Self::new(error.to_string())
    }
}

/// Lines written to the diagnostic stream during one invocation, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticLog(Vec<String>);

impl DiagnosticLog {
    /// Splits captured bytes into lines, stripping `\n` and `\r\n`.
    ///
    /// A trailing line without a terminator is kept; invalid UTF-8 is replaced.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(
            String::from_utf8_lossy(bytes)
                .lines()
                .map(str::to_owned)
                .collect(),
        )
    }

    /// Captured lines.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.0
    }

    /// Number of captured lines.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was captured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for DiagnosticLog {
    fn from(lines: Vec<String>) -> Self {
        Self(lines)
    }
}

/// Result of one handler invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The handler returned normally; the value may be `null`.
    Success(Value),
    /// The handler failed, panicked, or returned an unserialisable value.
    Failure(InvocationError),
}

impl Outcome {
    /// Builds a failure outcome.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(InvocationError::new(message))
    }

    /// Whether the invocation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Short label used in access logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Failure(_) => "failure",
        }
    }
}

/// Diagnostic half of the response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseContext {
    /// Failure message, `null` on success.
    pub error: Option<InvocationError>,
    /// Captured diagnostic lines, always present.
    pub logs: DiagnosticLog,
}

/// Response envelope returned by the persistent HTTP service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    /// Error and diagnostic lines.
    pub context: ResponseContext,
    /// Handler result, `null` on failure.
    pub payload: Option<Value>,
}

impl InvocationResponse {
    /// Assembles the envelope for a finished invocation.
    #[must_use]
    pub fn new(outcome: Outcome, logs: DiagnosticLog) -> Self {
        let (payload, error) = match outcome {
            Outcome::Success(value) => (Some(value), None),
            Outcome::Failure(error) => (None, Some(error)),
        };
        Self {
            context: ResponseContext { error, logs },
            payload,
        }
    }
}
