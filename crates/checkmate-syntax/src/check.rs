//! The built-in syntax-only check used when no external checker is usable.
//!
//! The report matches what Python's compiler raises for the same source:
//! the same message and the same line and column. Four passes contribute
//! findings and the earliest one Python would raise wins:
//!
//! - the tokenizer, whose fatal errors stop everything else;
//! - the layout pass over indented blocks and statement headers;
//! - the Tree-sitter parse, with Python 2 statements named explicitly;
//! - the scope checks Python's compiler runs once parsing succeeds.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::diagnostic::Diagnostic;
use crate::error::SyntaxError;
use crate::layout::check_layout;
use crate::lexer::{Lexed, lex};
use crate::parser::{PythonParser, SyntaxErrorInfo};
use crate::scope::check_scopes;
use crate::statements::tree_findings;

const CHECK_TARGET: &str = "checkmate_syntax::check";

/// Outcome of the built-in syntax check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxReport {
    /// The source compiles without errors.
    Clean,
    /// The source contains at least one syntax error; only the first is kept.
    Invalid(SyntaxErrorInfo),
}

impl SyntaxReport {
    /// Returns the reported error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&SyntaxErrorInfo> {
        match self {
            Self::Clean => None,
            Self::Invalid(info) => Some(info),
        }
    }
}

/// Checks Python source text and reports the error Python would raise.
///
/// # Errors
///
/// Returns an error if the parser cannot be initialised or yields no tree.
pub fn check_source(source: &str) -> Result<SyntaxReport, SyntaxError> {
    let finding = find_error(source)?;

    if let Some(found) = &finding {
        debug!(
            target: CHECK_TARGET,
            line = found.at.line,
            column = found.at.column,
            message = %found.message,
            "syntax error found"
        );
    }

    Ok(finding.map_or(SyntaxReport::Clean, |found| {
        SyntaxReport::Invalid(SyntaxErrorInfo::from_diagnostic(found, source))
    }))
}

fn find_error(source: &str) -> Result<Option<Diagnostic>, SyntaxError> {
    let lexed = lex(source);
    if let Some(fatal) = &lexed.fatal {
        return Ok(Some(fatal.clone()));
    }
    let mut parser = PythonParser::new()?;
    let parsed = parser.parse(source)?;
    Ok(first_finding(source, &lexed, parsed.tree().root_node()))
}

/// Picks the finding Python raises first.
///
/// Tokenizer and block errors stop Python's parser where they occur. A parser
/// error only beats them from an earlier line, since Python reports some
/// parser errors after reading the rest of the line. An unclosed bracket is
/// only noticed at the end of input, so it loses to anything Python meets
/// on or before the bracket's line.
fn first_finding(
    source: &str,
    lexed: &Lexed<'_>,
    root: tree_sitter::Node<'_>,
) -> Option<Diagnostic> {
    let layout = check_layout(lexed);
    let structural = lexed
        .positional
        .iter()
        .chain(&layout.structural)
        .min_by_key(|found| found.at);
    let from_tree = tree_findings(root, &lexed.tokens, source);
    let parsed = from_tree.iter().chain(&layout.soft).min_by_key(|found| found.at);
    let positional = match (structural, parsed) {
        (Some(block), Some(tree)) if tree.at.line < block.at.line => Some(tree),
        (Some(block), _) => Some(block),
        (None, tree) => tree,
    };

    if let Some(unclosed) = &lexed.unclosed {
        let last = lexed.last_significant().map(|token| token.at);
        let unclosed_wins = positional.is_none_or(|found| {
            found.at.line > unclosed.at.line || last.is_some_and(|at| found.at > at)
        });
        if unclosed_wins {
            return Some(unclosed.clone());
        }
    }

    positional.cloned().or_else(|| check_scopes(root, source))
}

/// Reads `path` and checks it with [`check_source`].
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected, so a
/// stray Latin-1 comment still yields a useful report. A leading byte order
/// mark is dropped and a newline is appended, as Python does when compiling
/// a file.
///
/// # Errors
///
/// Returns [`SyntaxError::Read`] when the file cannot be read, or any error
/// from [`check_source`].
pub fn check_file(path: &Path) -> Result<SyntaxReport, SyntaxError> {
    let bytes = fs::read(path).map_err(|source| SyntaxError::read(path, source))?;
    let decoded = String::from_utf8_lossy(&bytes);
    let text: &str = &decoded;
    let mut source = text.strip_prefix('\u{feff}').unwrap_or(text).to_owned();
    source.push('\n');
    let report = check_source(&source)?;

    debug!(
        target: CHECK_TARGET,
        path = %path.display(),
        clean = matches!(report, SyntaxReport::Clean),
        "built-in syntax check finished"
    );

    Ok(report)
}
