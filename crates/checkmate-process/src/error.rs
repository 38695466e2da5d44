//! Errors raised while driving a checker process.
//!
//! I/O errors are wrapped in `Arc` to keep the enum small, matching the
//! `result_large_err` Clippy lint.

use std::sync::Arc;

use thiserror::Error;

/// Errors arising from [`ProcessHandle`](crate::ProcessHandle) operations.
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    /// The child process could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program that was being started.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A pipe to the child was not captured at spawn time.
    #[error("failed to capture {stream} of '{program}'")]
    MissingPipe {
        /// Program that was started.
        program: String,
        /// Name of the missing stream.
        stream: &'static str,
    },

    /// Waiting for readiness on the child's pipes failed.
    #[error("failed to wait for output: {source}")]
    Wait {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Reading from one of the child's pipes failed.
    #[error("failed to read {stream}: {source}")]
    Read {
        /// Name of the stream being read.
        stream: &'static str,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Checking the child's exit status failed.
    #[error("failed to query exit status: {source}")]
    Status {
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// [`ProcessHandle::drain`](crate::ProcessHandle::drain) was called twice.
    #[error("process output has already been drained")]
    AlreadyDrained,
}

impl ProcessError {
    pub(crate) fn read(stream: &'static str, source: std::io::Error) -> Self {
        Self::Read {
            stream,
            source: Arc::new(source),
        }
    }
}
