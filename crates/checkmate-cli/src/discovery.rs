//! Checker discovery: choosing which external program to run.
//!
//! Candidates are tried in a fixed order, optionally preceded by the user's
//! override. Each candidate is identified by its basename and validated by
//! running it once; the first one that answers is selected. Lookups and runs go
//! through [`CommandRunner`] so tests never touch the real `PATH`.

use std::ffi::OsString;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::process::{Command, Stdio};

use checkmate_config::{CheckerOverride, Config};
use tracing::debug;

use crate::pattern::LinePattern;

const DISCOVERY_TARGET: &str = "checkmate_cli::discovery";

/// Label shown when no external checker is used.
pub const BUILTIN_LABEL: &str = "Syntax check only";

/// Extra argument making Pylint print `path:line: message` lines.
const PYLINT_PARSEABLE: &str = "--output-format=parseable";

/// The checker programs `pycheckmate` knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerKind {
    /// PyChecker.
    PyChecker,
    /// PyFlakes.
    PyFlakes,
    /// Pylint.
    Pylint,
    /// The original `pep8` tool.
    Pep8,
    /// flake8.
    Flake8,
    /// pycodestyle, the successor of `pep8`.
    Pycodestyle,
}

impl CheckerKind {
    /// Default search order.
    pub const SEARCH_ORDER: [Self; 6] = [
        Self::PyChecker,
        Self::PyFlakes,
        Self::Pylint,
        Self::Pep8,
        Self::Flake8,
        Self::Pycodestyle,
    ];

    /// Executable name of the checker.
    #[must_use]
    pub const fn program_name(self) -> &'static str {
        match self {
            Self::PyChecker => "pychecker",
            Self::PyFlakes => "pyflakes",
            Self::Pylint => "pylint",
            Self::Pep8 => "pep8",
            Self::Flake8 => "flake8",
            Self::Pycodestyle => "pycodestyle",
        }
    }

    /// Identifies a checker from the basename of its executable.
    #[must_use]
    pub fn from_basename(basename: &str) -> Option<Self> {
        Self::SEARCH_ORDER
            .into_iter()
            .find(|kind| kind.program_name() == basename)
    }

    /// Line pattern matching this checker's output.
    #[must_use]
    pub fn pattern(self) -> LinePattern {
        match self {
            Self::PyChecker | Self::PyFlakes | Self::Pylint => LinePattern::line_only(),
            Self::Pep8 | Self::Flake8 | Self::Pycodestyle => LinePattern::optional_column(),
        }
    }

    const fn version_prefix(self) -> &'static str {
        match self {
            Self::PyChecker => "PyChecker",
            Self::PyFlakes => "PyFlakes",
            Self::Pylint => "Pylint",
            Self::Pep8 => "PEP 8",
            Self::Flake8 => "flake8",
            Self::Pycodestyle => "pycodestyle",
        }
    }
}

/// Captured result of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the program exited successfully.
    pub success: bool,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Access to the system for locating and validating checkers.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Resolves a candidate to an executable file. Bare names are looked up
    /// on `PATH`; anything containing a path separator must name a file.
    fn resolve(&self, candidate: &str) -> Option<PathBuf>;

    /// Runs `program` with `args` and stdin from the null device. `None`
    /// means it could not be started.
    fn run(&self, program: &Path, args: &[OsString]) -> Option<CommandOutput>;
}

/// [`CommandRunner`] backed by `PATH` lookup and real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn resolve(&self, candidate: &str) -> Option<PathBuf> {
        if has_separator(candidate) {
            let path = PathBuf::from(candidate);
            return path.is_file().then_some(path);
        }
        which::which(candidate).ok()
    }

    fn run(&self, program: &Path, args: &[OsString]) -> Option<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .ok()?;
        Some(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// A validated external checker ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerProgram {
    /// Which checker this is.
    pub kind: CheckerKind,
    /// Resolved executable path.
    pub path: PathBuf,
    /// Arguments placed before the target file.
    pub args: Vec<String>,
    /// Pattern recognising the checker's messages.
    pub pattern: LinePattern,
    /// Human-readable name and version for the report heading.
    pub label: String,
}

impl CheckerProgram {
    /// Builds the command that checks `target`.
    #[must_use]
    pub fn command(&self, target: &Path) -> Command {
        let mut command = Command::new(&self.path);
        command.args(&self.args).arg(target);
        command
    }
}

/// Outcome of checker discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckerSelection {
    /// Run an external checker.
    Program(CheckerProgram),
    /// Run the built-in syntax check.
    Builtin,
}

impl CheckerSelection {
    /// Label for the report heading.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Program(program) => &program.label,
            Self::Builtin => BUILTIN_LABEL,
        }
    }
}

/// Selects the checker to run for this invocation.
#[must_use]
pub fn find_checker(config: &Config, runner: &impl CommandRunner) -> CheckerSelection {
    let mut candidates: Vec<String> = Vec::with_capacity(CheckerKind::SEARCH_ORDER.len() + 1);
    match config.checker_override() {
        Some(CheckerOverride::Builtin) => {
            debug!(target: DISCOVERY_TARGET, "built-in check requested");
            return CheckerSelection::Builtin;
        }
        Some(CheckerOverride::Program(name)) => candidates.push(name),
        None => {}
    }
    candidates.extend(
        CheckerKind::SEARCH_ORDER
            .iter()
            .map(|kind| kind.program_name().to_owned()),
    );

    let options = config.checker_options();
    for candidate in &candidates {
        if let Some(program) = try_candidate(candidate, &options, runner) {
            debug!(
                target: DISCOVERY_TARGET,
                checker = %program.label,
                path = %program.path.display(),
                "selected checker"
            );
            return CheckerSelection::Program(program);
        }
    }

    debug!(target: DISCOVERY_TARGET, "no usable checker found");
    CheckerSelection::Builtin
}

fn try_candidate(
    candidate: &str,
    options: &[String],
    runner: &impl CommandRunner,
) -> Option<CheckerProgram> {
    let basename = Path::new(candidate).file_name()?.to_string_lossy();
    let Some(kind) = CheckerKind::from_basename(&basename) else {
        debug!(target: DISCOVERY_TARGET, candidate, "skipping unknown checker");
        return None;
    };
    let Some(path) = runner.resolve(candidate) else {
        debug!(target: DISCOVERY_TARGET, candidate, "checker not found");
        return None;
    };

    let (label, extra) = validate(kind, &path, runner)?;
    let mut args = options.to_vec();
    args.extend(extra);
    Some(CheckerProgram {
        kind,
        path,
        args,
        pattern: kind.pattern(),
        label,
    })
}

fn validate(
    kind: CheckerKind,
    path: &Path,
    runner: &impl CommandRunner,
) -> Option<(String, Vec<String>)> {
    match kind {
        CheckerKind::PyFlakes => {
            // No version flag: checking its own executable proves it works.
            let output = runner.run(path, &[path.as_os_str().to_owned()])?;
            (output.success && output.stderr.is_empty())
                .then(|| (kind.version_prefix().to_owned(), Vec::new()))
        }
        CheckerKind::PyChecker => {
            let version = version_line(runner, path, "-V")?;
            Some((format!("{} {version}", kind.version_prefix()), Vec::new()))
        }
        CheckerKind::Pylint => {
            let line = version_line(runner, path, "--version")?;
            let trimmed = line.strip_prefix("pylint").unwrap_or(&line).trim_start();
            let version = trimmed.strip_suffix(',').unwrap_or(trimmed);
            Some((
                format!("{} {version}", kind.version_prefix()),
                vec![PYLINT_PARSEABLE.to_owned()],
            ))
        }
        CheckerKind::Pep8 | CheckerKind::Flake8 | CheckerKind::Pycodestyle => {
            let version = version_line(runner, path, "--version")?;
            Some((format!("{} {version}", kind.version_prefix()), Vec::new()))
        }
    }
}

/// First non-empty stdout line of a successful version query.
fn version_line(runner: &impl CommandRunner, path: &Path, flag: &str) -> Option<String> {
    let output = runner.run(path, &[OsString::from(flag)])?;
    if !output.success {
        debug!(
            target: DISCOVERY_TARGET,
            path = %path.display(),
            "version query failed"
        );
        return None;
    }
    let line = output.stdout.lines().next()?.trim();
    (!line.is_empty()).then(|| line.to_owned())
}

fn has_separator(candidate: &str) -> bool {
    candidate.contains(MAIN_SEPARATOR) || candidate.contains('/')
}
