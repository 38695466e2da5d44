//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("failed to configure logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to determine the working directory: {0}")]
    WorkingDirectory(io::Error),
    #[error("failed to write the report: {0}")]
    WriteReport(io::Error),
}
