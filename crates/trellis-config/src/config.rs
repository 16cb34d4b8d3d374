//! The root [`EngineConfig`], its presets and validation.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LogFormat, LoggingConfig, PropertiesConfig, ResolutionConfig};

/// Upper bound accepted for `resolution.max_depth`.
pub const MAX_DEPTH_LIMIT: usize = 4096;

/// Everything an engine is built from.
///
/// Usually produced by [`ConfigLoader`](crate::ConfigLoader).
///
/// # Example
///
/// ```
/// use trellis_config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert!(config.resolution.constructive_coercion);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Member resolution settings.
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Property sources for `SystemProperty`.
    #[serde(default)]
    pub properties: PropertiesConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Starts a builder whose unset sections fall back to defaults.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Checks ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `resolution.max_depth` is zero or above [`MAX_DEPTH_LIMIT`]
    /// - `properties.env_prefix` is set but empty
    /// - `logging.level` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let depth = self.resolution.max_depth;
        if depth == 0 || depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::invalid_value(
                "resolution.max_depth",
                format!("must be between 1 and {MAX_DEPTH_LIMIT}, got {depth}"),
            ));
        }

        if self
            .properties
            .env_prefix
            .as_deref()
            .is_some_and(|prefix| prefix.trim().is_empty())
        {
            return Err(ConfigError::invalid_value(
                "properties.env_prefix",
                "must not be empty when set",
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value("logging.level", "must not be empty"));
        }

        Ok(())
    }

    /// Preset for working on scripts: debug level pretty logs, strict value
    /// tags so typos fail loudly, and a `.env` file is read.
    ///
    /// # Example
    ///
    /// ```
    /// use trellis_config::EngineConfig;
    ///
    /// let config = EngineConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;

        config.resolution.strict_value_tags = true;
        config.properties.dotenv = true;

        config
    }

    /// Preset for deployments: info level JSON logs without colour.
    ///
    /// # Example
    ///
    /// ```
    /// use trellis_config::{EngineConfig, LogFormat};
    ///
    /// let config = EngineConfig::production();
    /// assert_eq!(config.logging.format, LogFormat::Json);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;

        config
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    resolution: Option<ResolutionConfig>,
    properties: Option<PropertiesConfig>,
    logging: Option<LoggingConfig>,
}

impl EngineConfigBuilder {
    /// Same as `EngineConfig::builder()`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resolution configuration.
    #[must_use]
    pub fn resolution(mut self, resolution: ResolutionConfig) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Set the properties configuration.
    #[must_use]
    pub fn properties(mut self, properties: PropertiesConfig) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Finishes without validating.
    #[must_use]
    pub fn build(self) -> EngineConfig {
        EngineConfig {
            resolution: self.resolution.unwrap_or_default(),
            properties: self.properties.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Finishes, then runs [`EngineConfig::validate`].
    pub fn build_validated(self) -> Result<EngineConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
