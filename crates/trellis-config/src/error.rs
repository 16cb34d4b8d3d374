//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating an [`EngineConfig`](crate::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The configuration file exists but could not be read.
    #[error("failed to read {}", path.display())]
    Read {
        /// The unreadable path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The source is neither TOML nor JSON.
    #[error("unsupported configuration format {format:?}, expected toml or json")]
    UnsupportedFormat {
        /// The rejected extension or format name.
        format: String,
    },

    /// Malformed TOML, or TOML with unknown fields.
    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or JSON with unknown fields.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A field holds a value outside its allowed range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted field path, e.g. `resolution.max_depth`.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An override variable could not be parsed.
    #[error("invalid override {var}: {reason}")]
    InvalidOverride {
        /// The environment variable name.
        var: String,
        /// What was expected.
        reason: String,
    },

    /// A `.env` file exists but is malformed.
    #[error("failed to load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

impl ConfigError {
    /// Creates a not-found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates an unsupported-format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates an invalid-value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid-override error.
    pub fn invalid_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOverride {
            var: var.into(),
            reason: reason.into(),
        }
    }
}
