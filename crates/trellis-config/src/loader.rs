//! Layered configuration loading.
//!
//! Layers are applied in call order, later ones winning: a preset, then a
//! TOML or JSON document, then `PREFIX__SECTION__KEY` environment overrides.
//! Validation runs once, at [`ConfigLoader::load`].

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::{ConfigError, EngineConfig, LogFormat};

/// Document formats accepted by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::unsupported_format(name)),
        }
    }

    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        Self::from_name(extension)
    }

    fn parse(self, content: &str) -> Result<EngineConfig, ConfigError> {
        Ok(match self {
            Self::Toml => toml::from_str(content)?,
            Self::Json => serde_json::from_str(content)?,
        })
    }
}

/// Builds an [`EngineConfig`] from presets, documents and the environment.
///
/// # Example
///
/// ```no_run
/// use trellis_config::ConfigLoader;
///
/// # fn main() -> Result<(), trellis_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("trellis.toml")?
///     .with_env_prefix("TRELLIS")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: EngineConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader holding the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to the default configuration.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = EngineConfig::default();
        self
    }

    /// Resets to the development preset.
    ///
    /// ```
    /// use trellis_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = EngineConfig::development();
        self
    }

    /// Resets to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = EngineConfig::production();
        self
    }

    /// Replaces the configuration with the contents of a `.toml` or `.json`
    /// file. Unknown fields are rejected.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Read`, `UnsupportedFormat`, or a parse error.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::not_found(path));
        }
        let format = Format::from_path(path)?;
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;

        self.config = format.parse(&content)?;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file leaves the
    /// configuration unchanged.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Replaces the configuration with an inline document. `format` is
    /// `"toml"` or `"json"`.
    ///
    /// ```
    /// use trellis_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[resolution]\nmax_depth = 16", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.resolution.max_depth, 16);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = Format::from_name(format)?.parse(content)?;
        Ok(self)
    }

    /// Enables overrides of the form `PREFIX__SECTION__KEY`, e.g.
    /// `TRELLIS__RESOLUTION__MAX_DEPTH=32`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads a `.env` file into the process environment so its variables
    /// can act as overrides. A missing file is not an error.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Err(e) if !e.not_found() => Err(e.into()),
            _ => Ok(self),
        }
    }

    /// Applies environment overrides, then validates.
    ///
    /// # Errors
    ///
    /// `InvalidOverride` for an unparsable variable, `InvalidValue` when
    /// validation fails.
    pub fn load(mut self) -> Result<EngineConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let marker = format!("{prefix}__");
            for (var, value) in env::vars().filter(|(var, _)| var.starts_with(&marker)) {
                self.apply_env_var(&var, &value, &prefix)?;
            }
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration as is, skipping overrides and validation.
    #[must_use]
    pub fn load_unvalidated(self) -> EngineConfig {
        self.config
    }

    fn apply_env_var(&mut self, var: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let path = var
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix("__"))
            .ok_or_else(|| ConfigError::invalid_override(var, "missing prefix"))?;
        let Some((section, key)) = path.split_once("__") else {
            return Ok(());
        };

        let config = &mut self.config;
        match (section, key) {
            ("RESOLUTION", "CONSTRUCTIVE_COERCION") => {
                config.resolution.constructive_coercion = flag(var, value)?;
            }
            ("RESOLUTION", "STRICT_VALUE_TAGS") => {
                config.resolution.strict_value_tags = flag(var, value)?;
            }
            ("RESOLUTION", "MAX_DEPTH") => config.resolution.max_depth = number(var, value)?,
            ("PROPERTIES", "USE_ENV") => config.properties.use_env = flag(var, value)?,
            ("PROPERTIES", "ENV_PREFIX") => {
                config.properties.env_prefix =
                    Some(value).filter(|v| !v.is_empty()).map(str::to_string);
            }
            ("PROPERTIES", "DOTENV") => config.properties.dotenv = flag(var, value)?,
            ("LOGGING", "ENABLED") => config.logging.enabled = flag(var, value)?,
            ("LOGGING", "LEVEL") => config.logging.level = value.to_string(),
            ("LOGGING", "FORMAT") => {
                config.logging.format = match value.to_ascii_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(ConfigError::invalid_override(var, "expected json or pretty")),
                };
            }
            ("LOGGING", "ANSI_ENABLED") => config.logging.ansi_enabled = flag(var, value)?,
            ("LOGGING", "INCLUDE_LOCATION") => config.logging.include_location = flag(var, value)?,
            _ => {}
        }
        Ok(())
    }
}

fn flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::invalid_override(var, "expected boolean"))
}

fn number<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid_override(var, "expected integer"))
}

/// Accepts `true/false`, `1/0`, `yes/no` and `on/off`, in any case.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
