//! Typed configuration for the Trellis engine.
//!
//! Settings come from a preset, an optional TOML or JSON document with no
//! unknown fields allowed, and `PREFIX__SECTION__KEY` environment overrides,
//! in that order.
//!
//! The root type is [`EngineConfig`]:
//!
//! - [`ResolutionConfig`] - Member resolution behaviour
//! - [`PropertiesConfig`] - Sources for `SystemProperty` values
//! - [`LoggingConfig`] - Log level and format
//!
//! # Example
//!
//! ```no_run
//! use trellis_config::ConfigLoader;
//!
//! # fn main() -> Result<(), trellis_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("trellis.toml")?
//!     .with_env_prefix("TRELLIS")
//!     .load()?;
//!
//! println!("max nesting: {}", config.resolution.max_depth);
//! # Ok(())
//! # }
//! ```
//!
//! # File layout
//!
//! ```toml
//! [resolution]
//! constructive_coercion = true
//! strict_value_tags = false
//! max_depth = 64
//!
//! [properties]
//! use_env = true
//! env_prefix = "APP"
//!
//! [properties.overrides]
//! "jetty.home" = "/opt/jetty"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Overrides
//!
//! Values can be overridden with variables of the form `PREFIX__SECTION__KEY`:
//!
//! - `TRELLIS__RESOLUTION__MAX_DEPTH=32`
//! - `TRELLIS__PROPERTIES__ENV_PREFIX=APP`
//! - `TRELLIS__LOGGING__FORMAT=pretty`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
