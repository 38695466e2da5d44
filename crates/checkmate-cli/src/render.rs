//! Rendering of individual output lines into report markup.

use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use checkmate_syntax::SyntaxReport;
use unicode_width::UnicodeWidthStr;

use crate::html::{escape_html, nbsp, txmt_url};
use crate::pattern::{CheckerRecord, LinePattern};

/// Separator placed between a link and a message that would overflow the
/// wrap width.
const WRAPPED_SEPARATOR: &str = "<br>&nbsp;&nbsp;";

/// Settings that shape how checker locations are linked and displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkContext {
    project_directory: Option<Utf8PathBuf>,
    wrap_width: usize,
    working_dir: PathBuf,
}

impl LinkContext {
    /// Builds a context resolving relative checker paths against
    /// `working_dir`.
    #[must_use]
    pub fn new(
        project_directory: Option<&Utf8Path>,
        wrap_width: usize,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project_directory: project_directory.map(Utf8Path::to_path_buf),
            wrap_width,
            working_dir: working_dir.into(),
        }
    }

    /// Absolute form of a path printed by a checker.
    #[must_use]
    pub fn absolute(&self, path: &str) -> PathBuf {
        let joined = self.working_dir.join(path);
        joined.components().collect()
    }

    /// The path as shown to the reader: relative to the project directory
    /// when it lies beneath it, otherwise unchanged.
    #[must_use]
    pub fn display_name<'a>(&self, path: &'a str) -> &'a str {
        self.project_directory
            .as_deref()
            .and_then(|root| Utf8Path::new(path).strip_prefix(root).ok())
            .map(Utf8Path::as_str)
            .filter(|relative| !relative.is_empty())
            .unwrap_or(path)
    }

    fn separator(&self, display: &str, message: &str) -> &'static str {
        if display.width() + message.width() > self.wrap_width {
            WRAPPED_SEPARATOR
        } else {
            " "
        }
    }
}

/// Renders one checker stdout line, linking it when `pattern` recognises it.
#[must_use]
pub fn render_stdout_line(line: &str, pattern: &LinePattern, context: &LinkContext) -> String {
    let trimmed = line.trim_end();
    pattern.parse(trimmed).map_or_else(
        || format!("{}<br>", escape_html(trimmed)),
        |record| render_record(&record, context),
    )
}

fn render_record(record: &CheckerRecord, context: &LinkContext) -> String {
    let href = txmt_url(
        &context.absolute(&record.file_path),
        record.line_number,
        None,
    );
    let display = context.display_name(&record.file_path);
    let separator = context.separator(display, &record.message);
    format!(
        "<a href=\"{href}\">{}:{}</a>{separator}{}<br>",
        escape_html(display),
        record.line_number,
        escape_html(&record.message),
    )
}

/// Renders one checker stderr line, keeping its indentation visible.
#[must_use]
pub fn render_stderr_line(line: &str) -> String {
    let stripped = line.trim_start();
    let indent = line.chars().count() - stripped.chars().count();
    format!(
        "<span class=\"stderr\">{}{}</span><br>",
        nbsp(indent),
        escape_html(stripped.trim_end()),
    )
}

/// Renders the outcome of the built-in syntax check for `path`.
///
/// Returns the report lines in output order.
#[must_use]
pub fn render_syntax_report(path: &Path, report: &SyntaxReport) -> Vec<String> {
    let outcome = report.error().map_or_else(
        || String::from("None<br>"),
        |info| {
            let basename = path
                .file_name()
                .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy());
            let href = txmt_url(path, info.line, Some(info.column));
            format!(
                "<a href=\"{href}\">{}:{}</a> {}<br>",
                escape_html(&basename),
                info.line,
                escape_html(&info.message),
            )
        },
    );
    vec![String::from("Syntax Errors...<br><br>"), outcome]
}

/// Renders a multi-line diagnostic as stderr-styled lines.
#[must_use]
pub fn render_diagnostic(message: &str) -> Vec<String> {
    message.lines().map(render_stderr_line).collect()
}
