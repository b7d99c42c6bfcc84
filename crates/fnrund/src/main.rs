//! Entry point for the persistent HTTP service.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    match fnrund::run_service() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            fnrund::batch::write_trace(&mut io::stderr().lock(), &error);
            ExitCode::FAILURE
        }
    }
}
