use std::time::Duration;

/// Default log filter expression. The formatter runs inside an editor, so
/// only warnings and errors reach stderr unless asked otherwise.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Combined display width of file name and message above which the message
/// moves onto its own indented line.
pub const DEFAULT_WRAP_WIDTH: usize = 80;

/// Upper bound on a single readiness wait, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default log filter expression used by the binary.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Default readiness wait as a [`Duration`].
#[must_use]
pub const fn default_poll_interval() -> Duration {
    Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
}
