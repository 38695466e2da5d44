//! Runtime for `pycheckmate`, which turns Python checker output into an
//! HTML report with editor links.
//!
//! [`run`] is the whole program: it splits configuration flags from the
//! file argument, loads [`Config`], picks a checker through
//! [`discovery`], and writes the document assembled by [`report`]. Tests
//! drive the same path with substitute configuration and command runners.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use checkmate_config::Config;
use clap::Parser;
use clap::error::ErrorKind;
use tracing::debug;

mod cli;
mod config;
pub mod discovery;
mod errors;
pub mod html;
pub mod pattern;
pub mod render;
pub mod report;
pub mod telemetry;

use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, command_arguments, split_config_arguments};
use discovery::{CommandRunner, SystemRunner};
use errors::AppError;
use report::{ReportOutcome, ReportRequest, write_report};

const RUN_TARGET: &str = "checkmate_cli::run";

/// Runs `pycheckmate` with the given arguments and output streams.
///
/// The report goes to `stdout`; usage errors and configuration failures go
/// to `stderr`. The checker's own exit status is part of the report and
/// never becomes the process exit code.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with(args, stdout, stderr, &OrthoConfigLoader, &SystemRunner)
}

pub(crate) fn run_with<I, W, E, L, P>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
    runner: &P,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
    P: CommandRunner,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&arguments);

    let cli = match Cli::try_parse_from(command_arguments(&arguments, &split)) {
        Ok(cli) => cli,
        Err(error) => {
            let informational =
                matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion);
            let (sink, code): (&mut dyn Write, ExitCode) = if informational {
                (stdout, ExitCode::SUCCESS)
            } else {
                (stderr, ExitCode::FAILURE)
            };
            drop(write!(sink, "{error}"));
            return code;
        }
    };

    let result = loader
        .load(&split.config_arguments)
        .and_then(|config| generate(&cli, &config, runner, stdout));

    match result {
        Ok(ReportOutcome::Completed) => ExitCode::SUCCESS,
        Ok(ReportOutcome::UnreadableTarget) => ExitCode::FAILURE,
        Err(error) => {
            drop(writeln!(stderr, "pycheckmate: {error}"));
            ExitCode::FAILURE
        }
    }
}

fn generate<P: CommandRunner, W: Write>(
    cli: &Cli,
    config: &Config,
    runner: &P,
    stdout: &mut W,
) -> Result<ReportOutcome, AppError> {
    telemetry::initialise(config)?;
    let working_dir = std::env::current_dir().map_err(AppError::WorkingDirectory)?;
    debug!(
        target: RUN_TARGET,
        file = %cli.file.display(),
        cwd = %working_dir.display(),
        "generating report"
    );
    let request = ReportRequest {
        target: &cli.file,
        config,
        working_dir: &working_dir,
    };
    write_report(&request, runner, stdout).map_err(AppError::WriteReport)
}

#[cfg(test)]
mod tests;
