//! One-shot stdin/stdout binding.
//!
//! The batch binary reads a single `{"context": ..., "input": ...}` object from
//! standard input, runs the handler once under diagnostic capture, and writes
//! the handler's raw result to standard output. Captured lines go to standard
//! error afterwards. Handler failures still exit successfully with `null` on
//! stdout; anything that prevents the invocation from being attempted exits
//! with status 1 and a failure trace on stderr.

use std::error::Error as StdError;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use thiserror::Error;

use crate::bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::encoder::{self, EncodeError};
use crate::envelope::{BatchRequest, DecodeError, Outcome};
use crate::handler::HandlerRegistry;
use crate::health::StructuredHealthReporter;

/// Standard streams used by one batch run.
pub struct BatchStreams<'a, R: Read, W: Write, E: Write> {
    stdin: &'a mut R,
    stdout: &'a mut W,
    stderr: &'a mut E,
}

impl<'a, R: Read, W: Write, E: Write> BatchStreams<'a, R, W, E> {
    /// Bundles the three streams.
    pub const fn new(stdin: &'a mut R, stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }
}

/// Failures that stop a batch run before or after the handler.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Configuration, telemetry, or handler resolution failed.
    #[error("startup failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// Standard input could not be read.
    #[error("failed to read standard input: {source}")]
    ReadInput {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Standard input did not hold a request object.
    #[error("failed to decode standard input: {source}")]
    Decode {
        /// Underlying decode error.
        #[source]
        source: DecodeError,
    },
    /// The handler result could not be encoded.
    #[error("failed to encode result: {source}")]
    Encode {
        /// Underlying encode error.
        #[source]
        source: EncodeError,
    },
    /// Standard output or error could not be written.
    #[error("failed to write output: {source}")]
    WriteOutput {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl From<io::Error> for BatchError {
    fn from(source: io::Error) -> Self {
        Self::WriteOutput { source }
    }
}

/// Runs one batch invocation with production collaborators.
#[must_use]
pub fn run<R: Read, W: Write, E: Write>(streams: &mut BatchStreams<'_, R, W, E>) -> ExitCode {
    run_with(&SystemConfigLoader, &HandlerRegistry::with_builtins(), streams)
}

/// Runs one batch invocation with an injected loader and registry.
#[must_use]
pub fn run_with<R: Read, W: Write, E: Write>(
    loader: &dyn ConfigLoader,
    registry: &HandlerRegistry,
    streams: &mut BatchStreams<'_, R, W, E>,
) -> ExitCode {
    match execute(loader, registry, streams) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            write_trace(&mut *streams.stderr, &error);
            ExitCode::FAILURE
        }
    }
}

fn execute<R: Read, W: Write, E: Write>(
    loader: &dyn ConfigLoader,
    registry: &HandlerRegistry,
    streams: &mut BatchStreams<'_, R, W, E>,
) -> Result<(), BatchError> {
    let runtime = bootstrap_with(loader, &StructuredHealthReporter::new(), registry)
        .map_err(|source| BatchError::Bootstrap { source })?;

    let mut input = Vec::new();
    streams
        .stdin
        .read_to_end(&mut input)
        .map_err(|source| BatchError::ReadInput { source })?;
    let request = BatchRequest::decode(&input).map_err(|source| BatchError::Decode { source })?;

    let invocation = runtime.invoker().run(&request.context, request.input);
    let output = match &invocation.outcome {
        Outcome::Success(value) => {
            encoder::encode_batch(value).map_err(|source| BatchError::Encode { source })?
        }
        Outcome::Failure(_) => b"null\n".to_vec(),
    };

    streams.stdout.write_all(&output)?;
    streams.stdout.flush()?;
    for line in invocation.logs.lines() {
        writeln!(streams.stderr, "{line}")?;
    }
    if let Outcome::Failure(error) = &invocation.outcome {
        writeln!(streams.stderr, "error: {}", error.message())?;
    }
    streams.stderr.flush()?;
    Ok(())
}

/// Writes `error` followed by each of its sources, one per line.
///
/// Write failures are ignored.
pub fn write_trace(stderr: &mut dyn Write, error: &dyn StdError) {
    stderr
        .write_all(render_trace(error).as_bytes())
        .and_then(|()| stderr.flush())
        .ok();
}

fn render_trace(error: &dyn StdError) -> String {
    let mut trace = format!("error: {error}\n");
    let mut source = error.source();
    while let Some(cause) = source {
        trace.push_str(&format!("  caused by: {cause}\n"));
        source = cause.source();
    }
    trace
}
