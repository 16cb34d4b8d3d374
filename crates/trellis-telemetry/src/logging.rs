//! Structured logging for Trellis.
//!
//! Installs a `tracing-subscriber` registry driven by
//! [`LoggingConfig`](trellis_config::LoggingConfig). The engine emits
//! `debug` events per applied directive, `trace` events per rejected
//! candidate and `warn` events for soft failures, all inside a
//! `configure` span. Events carry `type_name`, `member`, `tier`,
//! `value_kind` and `depth` fields where they apply.
//!
//! # Example
//!
//! ```rust,no_run
//! use trellis_config::LoggingConfig;
//! use trellis_telemetry::init_logging;
//!
//! init_logging(&LoggingConfig::default())?;
//! tracing::info!(script = "jetty.xml", "Configuring server");
//! # Ok::<(), trellis_telemetry::TelemetryError>(())
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};
use trellis_config::{LogFormat, LoggingConfig};

use crate::error::TelemetryError;
use crate::TelemetryResult;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber described by `config`.
///
/// Does nothing when logging is disabled.
///
/// # Errors
///
/// `InvalidConfig` when the level is not a valid filter, checked before
/// anything is installed. `LoggingInit` when a global subscriber exists.
pub fn init_logging(config: &LoggingConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let layer = fmt_layer(config)?;
    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

fn fmt_layer(config: &LoggingConfig) -> TelemetryResult<BoxedLayer> {
    let filter = create_env_filter(&config.level)?;
    let base = tracing_subscriber::fmt::layer()
        .with_ansi(config.ansi_enabled)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(true);

    Ok(match config.format {
        LogFormat::Json => base.json().with_filter(filter).boxed(),
        LogFormat::Pretty => base.pretty().with_filter(filter).boxed(),
    })
}

/// Parses a filter directive such as `"info"` or
/// `"trellis_engine=trace,warn"`.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::InvalidConfig(format!("bad log level {filter:?}: {e}")))
}
