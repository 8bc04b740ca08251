//! Configuration Loader
//!
//! Environment-aware loading: defaults, then configuration files, then
//! `SIGNAL_DISPATCH__*` environment variables.

use super::error::{ConfigResult, ConfigurationError};
use super::DispatchConfig;
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Base name of the configuration file searched in the working directory.
pub const DEFAULT_CONFIG_NAME: &str = "signal-dispatch";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "SIGNAL_DISPATCH";

/// Current deployment environment, from `SIGNAL_DISPATCH_ENV` or `APP_ENV`.
pub fn detect_environment() -> String {
    std::env::var("SIGNAL_DISPATCH_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_file: Option<PathBuf>,
    environment: String,
    env_overrides: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_file: None,
            environment: detect_environment(),
            env_overrides: None,
        }
    }

    /// Load from an explicit file instead of searching for `signal-dispatch.*`.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Read overrides from `variables` instead of the process environment.
    #[must_use]
    pub fn with_env_overrides(mut self, variables: HashMap<String, String>) -> Self {
        self.env_overrides = Some(variables);
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn load(&self) -> ConfigResult<DispatchConfig> {
        let mut builder = Config::builder();

        match &self.config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigurationError::FileNotFound(path.display().to_string()));
                }
                builder = builder.add_source(File::from(path.as_path()).required(true));
            }
            None => {
                builder = builder
                    .add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false))
                    .add_source(
                        File::with_name(&format!("{DEFAULT_CONFIG_NAME}.{}", self.environment))
                            .required(false),
                    );
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(self.env_overrides.clone()),
        );

        let config: DispatchConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            environment = %self.environment,
            file = ?self.config_file,
            config = %serde_json::to_string(&config).unwrap_or_else(|_| "[serialization error]".to_string()),
            "Dispatch configuration loaded"
        );
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::FanOutStrategy;
    use crate::registry::BindingPolicy;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "binding_policy = \"single\"\nvalidate_signals = true\n\n[logging]\njson = true"
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_file(file.path())
            .with_env_overrides(HashMap::new())
            .load()
            .unwrap();

        assert_eq!(config.binding_policy, BindingPolicy::Single);
        assert!(config.validate_signals);
        assert!(config.logging.json);
        assert_eq!(config.fan_out_strategy, FanOutStrategy::Sequential);
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "binding_policy = \"single\"").unwrap();

        let overrides = HashMap::from([
            (
                "SIGNAL_DISPATCH__BINDING_POLICY".to_string(),
                "fan_out".to_string(),
            ),
            (
                "SIGNAL_DISPATCH__FAN_OUT_STRATEGY".to_string(),
                "concurrent".to_string(),
            ),
        ]);
        let config = ConfigLoader::new()
            .with_file(file.path())
            .with_env_overrides(overrides)
            .load()
            .unwrap();

        assert_eq!(config.binding_policy, BindingPolicy::FanOut);
        assert_eq!(config.fan_out_strategy, FanOutStrategy::Concurrent);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = ConfigLoader::new()
            .with_file("/nonexistent/signal-dispatch.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::FileNotFound(_)));
    }

    #[test]
    fn test_invalid_level_fails_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[logging]\nlevel = \"chatty\"").unwrap();

        let err = ConfigLoader::new()
            .with_file(file.path())
            .with_env_overrides(HashMap::new())
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidValue { .. }));
    }
}
