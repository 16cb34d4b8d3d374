//! Logging setup for Trellis.
//!
//! The engine itself only emits `tracing` events; this crate installs the
//! subscriber that renders them, as JSON for production or pretty-printed for
//! development, configured from [`trellis_config::LoggingConfig`].
//!
//! # Example
//!
//! ```rust,no_run
//! use trellis_config::EngineConfig;
//! use trellis_telemetry::init_logging;
//!
//! let config = EngineConfig::development();
//! init_logging(&config.logging).expect("logging already initialized");
//! ```

#![doc(html_root_url = "https://docs.rs/trellis-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
