//! Recognition of checker output lines.
//!
//! A [`LinePattern`] is chosen once, by checker discovery, and passed to the
//! formatter for the whole run.

use once_cell::sync::Lazy;
use regex::Regex;

/// `path.py:LINE: message`
const LINE_ONLY_SOURCE: &str = r"^(.*?\.pyc?):(\d+):\s+(.*)$";

/// `path.py:LINE: message` or `path.py:LINE:COL: message`
const OPTIONAL_COLUMN_SOURCE: &str = r"^(.*?\.pyc?):(\d+):(?:\d+:)?\s+(.*)$";

#[expect(clippy::expect_used, reason = "pattern is a compile-time constant")]
static LINE_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(LINE_ONLY_SOURCE).expect("line-only pattern compiles"));

#[expect(clippy::expect_used, reason = "pattern is a compile-time constant")]
static OPTIONAL_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(OPTIONAL_COLUMN_SOURCE).expect("optional-column pattern compiles"));

/// One recognised checker message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerRecord {
    /// File path exactly as the checker printed it.
    pub file_path: String,
    /// One-based line number.
    pub line_number: u32,
    /// Message text following the location.
    pub message: String,
}

/// The regular expression used to split checker output into records.
#[derive(Debug, Clone)]
pub struct LinePattern {
    regex: &'static Regex,
}

impl LinePattern {
    /// Matches `path:line: message` (PyChecker, PyFlakes, Pylint).
    #[must_use]
    pub fn line_only() -> Self {
        Self {
            regex: Lazy::force(&LINE_ONLY),
        }
    }

    /// Also accepts `path:line:col: message` (pep8, flake8, pycodestyle).
    /// The column is tolerated but not captured.
    #[must_use]
    pub fn optional_column() -> Self {
        Self {
            regex: Lazy::force(&OPTIONAL_COLUMN),
        }
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Parses one output line. Anything that does not match, including a
    /// line number too large to represent, yields `None`.
    #[must_use]
    pub fn parse(&self, line: &str) -> Option<CheckerRecord> {
        let captures = self.regex.captures(line)?;
        let file_path = captures.get(1)?.as_str();
        let line_number = captures.get(2)?.as_str().parse().ok()?;
        let message = captures.get(3)?.as_str();
        Some(CheckerRecord {
            file_path: file_path.to_owned(),
            line_number,
            message: message.to_owned(),
        })
    }
}

impl Default for LinePattern {
    fn default() -> Self {
        Self::line_only()
    }
}

impl PartialEq for LinePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for LinePattern {}
