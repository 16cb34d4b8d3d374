//! Telemetry errors.

use thiserror::Error;

/// Failure to set up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("cannot install log subscriber: {0}")]
    LoggingInit(String),

    /// The logging section holds an unusable value.
    #[error("invalid logging configuration: {0}")]
    InvalidConfig(String),
}
