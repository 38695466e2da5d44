//! Child-process plumbing for the `pycheckmate` formatter.
//!
//! The crate owns one concern: running an external checker and turning its
//! interleaved stdout and stderr into complete lines without blocking on
//! either pipe. See [`ProcessHandle`] for the read loop contract.

mod error;
mod handle;
mod lines;
mod readiness;

pub use error::ProcessError;
pub use handle::{DEFAULT_POLL_INTERVAL, OutputBatch, ProcessHandle, describe_status};
pub use lines::LineBuffer;

#[cfg(all(test, unix))]
mod tests;
