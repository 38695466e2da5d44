//! `pycheckmate`: formats Python checker output as an HTML report.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    checkmate_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
