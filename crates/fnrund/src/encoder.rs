//! Serialises outcomes into response bytes.
//!
//! Encoding never fails from the caller's point of view: if the envelope
//! cannot be serialised, a fallback envelope carrying a generic error message
//! is produced instead.

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::envelope::{DiagnosticLog, InvocationResponse, Outcome};

/// Tracing target for encoding problems.
const ENCODER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::encoder");

const FALLBACK_ENVELOPE: &[u8] =
    br#"{"context":{"error":"response could not be serialized","logs":[]},"payload":null}"#;

/// Errors raised while turning values into JSON.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The handler returned a value with no JSON representation.
    #[error("handler result could not be serialized")]
    Result(#[source] serde_json::Error),

    /// The assembled envelope could not be written.
    #[error("response could not be serialized")]
    Envelope(#[source] serde_json::Error),
}

/// Serialises an envelope, reporting failure instead of substituting output.
///
/// # Errors
///
/// Returns [`EncodeError::Envelope`] when serialisation fails.
pub fn try_encode(response: &InvocationResponse) -> Result<Vec<u8>, EncodeError> {
    serde_json::to_vec(response).map_err(EncodeError::Envelope)
}

/// Builds the service envelope for `outcome` and `logs`.
#[must_use]
pub fn encode(outcome: Outcome, logs: DiagnosticLog) -> Vec<u8> {
    let response = InvocationResponse::new(outcome, logs);
    try_encode(&response).unwrap_or_else(|error| {
        warn!(target: ENCODER_TARGET, error = %error, "falling back to generic envelope");
        FALLBACK_ENVELOPE.to_vec()
    })
}

/// Serialises the raw value returned by the batch binding, newline-terminated.
///
/// # Errors
///
/// Returns [`EncodeError::Result`] when the value cannot be serialised.
pub fn encode_batch(value: &Value) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = serde_json::to_vec(value).map_err(EncodeError::Result)?;
    bytes.push(b'\n');
    Ok(bytes)
}
