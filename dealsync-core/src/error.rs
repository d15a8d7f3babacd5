//! Error types for dealsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// A submission value that failed boundary validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Phone must be 11–12 characters: digits with an optional leading `+`.
    #[error("invalid phone '{value}': expected 11-12 digits, optionally prefixed with '+'")]
    Phone { value: String },

    /// Delivery code must be exactly 12 characters.
    #[error("invalid delivery code '{value}': expected exactly 12 characters, got {len}")]
    DeliveryCode { value: String, len: usize },
}

/// All errors that can arise while loading [`crate::Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set (or was empty).
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    /// An environment variable was set but could not be parsed.
    #[error("invalid value for {name}: '{value}'")]
    InvalidVar { name: &'static str, value: String },

    /// Underlying I/O failure reading a config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::config_dir()` returned `None`.
    #[error("cannot determine the user config directory")]
    ConfigDirNotFound,
}
