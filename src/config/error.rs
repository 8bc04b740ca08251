//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to load configuration from {source_name}: {reason}")]
    LoadFailed { source_name: String, reason: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("configuration file not found: {0}")]
    FileNotFound(String),
}

impl ConfigurationError {
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(error: config::ConfigError) -> Self {
        Self::LoadFailed {
            source_name: "config".to_string(),
            reason: error.to_string(),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;
