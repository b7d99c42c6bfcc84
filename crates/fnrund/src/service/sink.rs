//! Request routing and the per-request invocation cycle.

use std::io::Read;
use std::time::Instant;

use tiny_http::{Header, Method, Request, Response};
use tracing::{debug, warn};

use super::SERVICE_TARGET;
use crate::encoder;
use crate::envelope::{DecodeError, DiagnosticLog, InvocationError, InvocationRequest, Outcome};
use crate::invoker::Invoker;

/// Path answered by the liveness probe.
pub const HEALTH_PATH: &str = "/healthz";

const HEALTH_BODY: &[u8] = b"{}";

/// Destination selected for an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Liveness probe.
    Health,
    /// Catch-all invocation sink.
    Invoke,
}

impl Route {
    /// Picks the route for `method` and `url`; the query string is ignored.
    #[must_use]
    pub fn select(method: &Method, url: &str) -> Self {
        let path = url.split_once('?').map_or(url, |(path, _)| path);
        if *method == Method::Get && path == HEALTH_PATH {
            Self::Health
        } else {
            Self::Invoke
        }
    }
}

/// Answers HTTP requests by running the resolved handler.
#[derive(Debug)]
pub struct InvocationSink {
    invoker: Invoker,
    max_request_bytes: usize,
}

impl InvocationSink {
    /// Builds a sink around `invoker` accepting bodies up to
    /// `max_request_bytes`.
    #[must_use]
    pub const fn new(invoker: Invoker, max_request_bytes: usize) -> Self {
        Self {
            invoker,
            max_request_bytes,
        }
    }

    /// Serves one HTTP request to completion.
    pub fn handle(&self, mut request: Request) {
        let started = Instant::now();
        let route = Route::select(request.method(), request.url());
        let (body, outcome) = match route {
            Route::Health => (HEALTH_BODY.to_vec(), "health"),
            Route::Invoke => match self.read_body(&mut request) {
                Ok(bytes) => self.process(&bytes),
                Err(error) => (reject(&error), "rejected"),
            },
        };
        debug!(
            target: SERVICE_TARGET,
            method = %request.method(),
            path = request.url(),
            outcome,
            elapsed_ms = elapsed_ms(started),
            "request served"
        );
        let mut response = Response::from_data(body).with_status_code(200);
        if let Some(header) = json_content_type() {
            response = response.with_header(header);
        }
        if let Err(error) = request.respond(response) {
            warn!(target: SERVICE_TARGET, error = %error, "failed to write response");
        }
    }

    /// Runs one invocation for a raw request body and returns the encoded
    /// envelope along with a short outcome label.
    #[must_use]
    pub fn process(&self, body: &[u8]) -> (Vec<u8>, &'static str) {
        match InvocationRequest::decode(body) {
            Ok(request) => {
                let invocation = self.invoker.run(&request.context, request.payload);
                let label = invocation.outcome.label();
                (encoder::encode(invocation.outcome, invocation.logs), label)
            }
            Err(error) => (reject(&error), "rejected"),
        }
    }

    fn read_body(&self, request: &mut Request) -> Result<Vec<u8>, DecodeError> {
        let max_size = self.max_request_bytes;
        if let Some(size) = request.body_length()
            && size > max_size
        {
            return Err(DecodeError::TooLarge { size, max_size });
        }
        let limit = u64::try_from(max_size).unwrap_or(u64::MAX).saturating_add(1);
        let mut body = Vec::new();
        request.as_reader().take(limit).read_to_end(&mut body)?;
        if body.len() > max_size {
            return Err(DecodeError::TooLarge {
                size: body.len(),
                max_size,
            });
        }
        Ok(body)
    }
}

fn reject(error: &DecodeError) -> Vec<u8> {
    encoder::encode(
        Outcome::Failure(InvocationError::from(error)),
        DiagnosticLog::default(),
    )
}

fn json_content_type() -> Option<Header> {
    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).ok()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
