//! Error types for the built-in syntax check.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors from the built-in syntax check.
///
/// A syntax error in the checked file is not an error here: it is the
/// expected result and is reported through
/// [`SyntaxReport::Invalid`](crate::SyntaxReport::Invalid).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyntaxError {
    /// Failed to initialise the Tree-sitter parser with the Python grammar.
    #[error("failed to initialise Python parser: {message}")]
    ParserInit {
        /// Description of the failure.
        message: String,
    },

    /// Tree-sitter produced no tree at all.
    #[error("failed to parse Python source: {message}")]
    Parse {
        /// Description of the failure.
        message: String,
    },

    /// The file to check could not be read.
    #[error("could not read {}: {source}", path.display())]
    Read {
        /// Path that failed to open or read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl SyntaxError {
    /// Creates a parser initialisation error.
    #[must_use]
    pub fn parser_init(message: impl Into<String>) -> Self {
        Self::ParserInit {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a read error for `path`.
    #[must_use]
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}
