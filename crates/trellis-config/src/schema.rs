//! Section types of [`EngineConfig`](crate::EngineConfig).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Member resolution section.
///
/// Controls how far the resolver goes to find a matching member and how
/// strictly scripts are checked.
///
/// # Example
///
/// ```
/// use trellis_config::ResolutionConfig;
///
/// let config = ResolutionConfig {
///     constructive_coercion: false,
///     ..Default::default()
/// };
/// assert_eq!(config.max_depth, 64);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResolutionConfig {
    /// Build setter arguments from text when no setter accepts them directly.
    #[serde(default = "default_true")]
    pub constructive_coercion: bool,

    /// Treat unknown value tags as fatal instead of evaluating them to nothing.
    #[serde(default)]
    pub strict_value_tags: bool,

    /// Maximum nesting of `New`/`Call` values and chained directives.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            constructive_coercion: true,
            strict_value_tags: false,
            max_depth: default_max_depth(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    64
}

/// Property source section, consulted by `SystemProperty` values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PropertiesConfig {
    /// Read properties from the process environment.
    #[serde(default = "default_true")]
    pub use_env: bool,

    /// Prefix for environment lookups (`server.port` -> `PREFIX_SERVER_PORT`).
    #[serde(default)]
    pub env_prefix: Option<String>,

    /// Load a `.env` file into the environment first.
    #[serde(default)]
    pub dotenv: bool,

    /// Fixed properties, consulted before the environment.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

impl Default for PropertiesConfig {
    fn default() -> Self {
        Self {
            use_env: true,
            env_prefix: None,
            dotenv: false,
            overrides: BTreeMap::new(),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human output.
    Pretty,
}

/// Logging section, consumed by `trellis-telemetry`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log filter (e.g. "info", "trellis_engine=trace").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Colour the pretty output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Add file and line to each event.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_defaults() {
        let config = ResolutionConfig::default();
        assert!(config.constructive_coercion);
        assert!(!config.strict_value_tags);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_properties_defaults() {
        let config = PropertiesConfig::default();
        assert!(config.use_env);
        assert!(config.env_prefix.is_none());
        assert!(!config.dotenv);
        assert!(config.overrides.is_empty());
    }

    #[test]
    fn test_logging_defaults() {
        let config = LoggingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_log_format_serde() {
        let format: LogFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(format, LogFormat::Json);

        let format: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config: ResolutionConfig = toml::from_str("max_depth = 8").unwrap();
        assert_eq!(config.max_depth, 8);
        assert!(config.constructive_coercion);
    }

    #[test]
    fn test_overrides_table() {
        let toml_str = r#"
            env_prefix = "APP"

            [overrides]
            "jetty.home" = "/opt/jetty"
        "#;
        let config: PropertiesConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.env_prefix.as_deref(), Some("APP"));
        assert_eq!(config.overrides["jetty.home"], "/opt/jetty");
    }
}
