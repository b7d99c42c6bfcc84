//! Entry point for one-shot stdin/stdout invocation.

use std::io;
use std::process::ExitCode;

use fnrund::batch::{self, BatchStreams};

fn main() -> ExitCode {
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    batch::run(&mut BatchStreams::new(&mut stdin, &mut stdout, &mut stderr))
}
