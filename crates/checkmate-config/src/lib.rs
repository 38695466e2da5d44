//! Layered configuration for the `pycheckmate` checker-output formatter.
//!
//! Values resolve from built-in defaults, an optional configuration file,
//! `TM_`-prefixed environment variables, and finally command-line flags. The
//! editor communicates through the environment (`TM_PYCHECKER`,
//! `TM_PYCHECKER_OPTIONS`, `TM_PROJECT_DIRECTORY`), so that layer carries
//! most of the weight in practice.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod checker;
mod defaults;
mod logging;

pub use checker::{BUILTIN_CHECKER, CheckerOverride};
pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WRAP_WIDTH, default_log_filter,
    default_log_filter_string, default_log_format, default_poll_interval,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved formatter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "TM_")]
pub struct Config {
    /// Checker to try first, or `builtin` for the syntax-only check.
    pub pychecker: Option<String>,
    /// Extra whitespace-separated options passed to the chosen checker.
    pub pychecker_options: Option<String>,
    /// Project root, used only to shorten displayed file paths.
    pub project_directory: Option<Utf8PathBuf>,
    /// Tracing filter expression in `EnvFilter` syntax.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Output format for diagnostics written to stderr.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Width threshold for wrapping long checker messages.
    #[ortho_config(default = defaults::DEFAULT_WRAP_WIDTH)]
    pub wrap_width: usize,
    /// Upper bound on each readiness wait while the checker runs.
    #[ortho_config(default = defaults::DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pychecker: None,
            pychecker_options: None,
            project_directory: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            wrap_width: DEFAULT_WRAP_WIDTH,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Returns the interpreted checker override, if any.
    #[must_use]
    pub fn checker_override(&self) -> Option<CheckerOverride> {
        self.pychecker.as_deref().and_then(CheckerOverride::parse)
    }

    /// Returns the extra checker options as individual tokens.
    #[must_use]
    pub fn checker_options(&self) -> Vec<String> {
        self.pychecker_options
            .as_deref()
            .map(|raw| raw.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    /// Returns the project directory, ignoring an empty value.
    #[must_use]
    pub fn project_directory(&self) -> Option<&Utf8Path> {
        self.project_directory
            .as_deref()
            .filter(|path| !path.as_str().is_empty())
    }

    /// Returns the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the message wrapping threshold.
    #[must_use]
    pub const fn wrap_width(&self) -> usize {
        self.wrap_width
    }

    /// Returns the bound on a single readiness wait.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
