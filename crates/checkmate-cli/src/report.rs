//! Assembly of the complete HTML report for one target file.
//!
//! The checker is chosen and started before anything is written, so a
//! checker that fails to start still yields a coherent document built
//! around the built-in syntax check.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use checkmate_config::Config;
use checkmate_process::{ProcessError, ProcessHandle, describe_status};
use checkmate_syntax::check_file;
use tracing::{debug, warn};

use crate::discovery::{
    BUILTIN_LABEL, CheckerProgram, CheckerSelection, CommandRunner, find_checker,
};
use crate::html::{PAGE_FOOTER, PRODUCT_NAME, escape_html, install_hint, page_header};
use crate::pattern::LinePattern;
use crate::render::{
    LinkContext, render_diagnostic, render_stderr_line, render_stdout_line, render_syntax_report,
};

const REPORT_TARGET: &str = "checkmate_cli::report";

/// How the report ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The report was produced; any checker findings are part of it.
    Completed,
    /// The target could not be read; the report only says so.
    UnreadableTarget,
}

/// Inputs for one report.
#[derive(Debug, Clone, Copy)]
pub struct ReportRequest<'a> {
    /// File to check, as given on the command line.
    pub target: &'a Path,
    /// Resolved configuration.
    pub config: &'a Config,
    /// Directory relative paths are resolved against.
    pub working_dir: &'a Path,
}

enum Body {
    Stream {
        handle: ProcessHandle,
        pattern: LinePattern,
    },
    Builtin,
    Unreadable(io::Error),
}

/// Discovers a checker, runs it against the target and writes the report.
///
/// # Errors
///
/// Returns an error only when writing to `out` fails. Problems with the
/// target or the checker are rendered into the document.
pub fn write_report<W: Write>(
    request: &ReportRequest<'_>,
    runner: &impl CommandRunner,
    out: &mut W,
) -> io::Result<ReportOutcome> {
    let selection = find_checker(request.config, runner);
    let (label, body) = prepare(request, selection);

    out.write_all(page_header(&title(request), &heading(&label)).as_bytes())?;
    if matches!(body, Body::Builtin) {
        writeln!(out, "{}", install_hint())?;
    }

    let outcome = match body {
        Body::Stream {
            mut handle,
            pattern,
        } => {
            let context = LinkContext::new(
                request.config.project_directory(),
                request.config.wrap_width(),
                request.working_dir,
            );
            stream_checker(&mut handle, &pattern, &context, out)?;
            ReportOutcome::Completed
        }
        Body::Builtin => {
            let absolute = absolute_target(request);
            let lines = match check_file(request.target) {
                Ok(report) => render_syntax_report(&absolute, &report),
                Err(err) => render_diagnostic(&err.to_string()),
            };
            write_lines(out, &lines)?;
            ReportOutcome::Completed
        }
        Body::Unreadable(err) => {
            let message = format!("cannot read {}: {err}", request.target.display());
            write_lines(out, &render_diagnostic(&message))?;
            ReportOutcome::UnreadableTarget
        }
    };

    out.write_all(PAGE_FOOTER.as_bytes())?;
    out.flush()?;
    Ok(outcome)
}

fn prepare(request: &ReportRequest<'_>, selection: CheckerSelection) -> (String, Body) {
    if let Err(err) = File::open(request.target) {
        warn!(
            target: REPORT_TARGET,
            path = %request.target.display(),
            error = %err,
            "target is not readable"
        );
        return (selection.label().to_owned(), Body::Unreadable(err));
    }

    let CheckerSelection::Program(program) = selection else {
        return (BUILTIN_LABEL.to_owned(), Body::Builtin);
    };
    match start_checker(&program, request) {
        Ok(handle) => (
            program.label,
            Body::Stream {
                handle,
                pattern: program.pattern,
            },
        ),
        Err(err) => {
            warn!(
                target: REPORT_TARGET,
                checker = %program.label,
                error = %err,
                "checker failed to start, using the built-in check"
            );
            (BUILTIN_LABEL.to_owned(), Body::Builtin)
        }
    }
}

#[cfg(unix)]
fn start_checker(
    program: &CheckerProgram,
    request: &ReportRequest<'_>,
) -> Result<ProcessHandle, ProcessError> {
    ProcessHandle::spawn(program.command(request.target))
        .map(|handle| handle.with_poll_interval(request.config.poll_interval()))
}

/// Output streaming needs `poll(2)`; elsewhere only the built-in check runs.
#[cfg(not(unix))]
fn start_checker(
    _program: &CheckerProgram,
    _request: &ReportRequest<'_>,
) -> Result<ProcessHandle, ProcessError> {
    Err(ProcessError::Wait {
        source: std::sync::Arc::new(io::Error::from(io::ErrorKind::Unsupported)),
    })
}

fn stream_checker<W: Write>(
    handle: &mut ProcessHandle,
    pattern: &LinePattern,
    context: &LinkContext,
    out: &mut W,
) -> io::Result<()> {
    loop {
        match handle.read_lines() {
            Ok(Some(batch)) => {
                for line in &batch.stdout {
                    writeln!(out, "{}", render_stdout_line(line, pattern, context))?;
                }
                for line in &batch.stderr {
                    writeln!(out, "{}", render_stderr_line(line))?;
                }
                if !batch.is_empty() {
                    out.flush()?;
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!(
                    target: REPORT_TARGET,
                    program = handle.program(),
                    error = %err,
                    "checker output was cut short"
                );
                write_lines(out, &render_diagnostic(&err.to_string()))?;
                break;
            }
        }
    }

    let status = match handle.status() {
        Ok(Some(status)) => describe_status(status),
        Ok(None) | Err(_) => String::from("unknown"),
    };
    debug!(target: REPORT_TARGET, %status, "checker finished");
    writeln!(out, "<br>Exit status: {status}")
}

fn write_lines<W: Write>(out: &mut W, lines: &[String]) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn absolute_target(request: &ReportRequest<'_>) -> PathBuf {
    request
        .working_dir
        .join(request.target)
        .components()
        .collect()
}

/// Page title: `file &mdash; project` inside a project, else the path.
fn title(request: &ReportRequest<'_>) -> String {
    request.config.project_directory().map_or_else(
        || escape_html(&request.target.to_string_lossy()),
        |project| {
            let script = request
                .target
                .file_name()
                .map_or_else(|| request.target.to_string_lossy(), |name| name.to_string_lossy());
            let project_name = project.file_name().unwrap_or_else(|| project.as_str());
            format!(
                "{} &mdash; {}",
                escape_html(&script),
                escape_html(project_name)
            )
        },
    )
}

fn heading(label: &str) -> String {
    format!(
        "{PRODUCT_NAME} {} &ndash; {}",
        env!("CARGO_PKG_VERSION"),
        escape_html(label)
    )
}
