//! # Dispatch Configuration
//!
//! Settings for registry construction and dispatch behaviour.
//!
//! ## Sources
//!
//! [`ConfigLoader`] merges, in increasing priority:
//!
//! 1. built-in defaults ([`DispatchConfig::default`]);
//! 2. an optional TOML/YAML/JSON file (`signal-dispatch.toml` by default);
//! 3. environment variables prefixed with `SIGNAL_DISPATCH`, nested keys
//!    separated by `__` (e.g. `SIGNAL_DISPATCH__BINDING_POLICY=single`).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use signal_dispatch::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().load()?;
//! println!("binding policy: {}", config.binding_policy);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::dispatcher::FanOutStrategy;
use crate::registry::BindingPolicy;
use serde::{Deserialize, Serialize};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Registry and dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Single handler per signal, or fan-out to every bound handler.
    pub binding_policy: BindingPolicy,
    /// How a dispatcher runs the handlers of one fan-out group.
    pub fan_out_strategy: FanOutStrategy,
    /// Scan universes and compile invoker groups on the rayon pool.
    pub parallel_build: bool,
    /// Reject bindings to signal types no universe declared.
    pub validate_signals: bool,
    /// Wrap every handler invocation in a tracing span.
    pub instrument_invocations: bool,
    pub logging: LoggingConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            binding_policy: BindingPolicy::FanOut,
            fan_out_strategy: FanOutStrategy::Sequential,
            parallel_build: true,
            validate_signals: false,
            instrument_invocations: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl DispatchConfig {
    /// Preset for single-result registries.
    pub fn single() -> Self {
        Self {
            binding_policy: BindingPolicy::Single,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.logging.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Explicit level; falls back to the environment mapping when unset.
    pub level: Option<String>,
}

impl LoggingConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        match &self.level {
            Some(level) if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) => {
                Err(ConfigurationError::invalid_value(
                    "logging.level",
                    format!("unknown level '{level}', expected one of {LOG_LEVELS:?}"),
                ))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert_eq!(config.binding_policy, BindingPolicy::FanOut);
        assert_eq!(config.fan_out_strategy, FanOutStrategy::Sequential);
        assert!(config.parallel_build);
        assert!(!config.validate_signals);
        assert!(config.validate().is_ok());
        assert_eq!(DispatchConfig::single().binding_policy, BindingPolicy::Single);
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let config = DispatchConfig {
            logging: LoggingConfig {
                json: false,
                level: Some("loud".to_string()),
            },
            ..DispatchConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: DispatchConfig =
            serde_json::from_str(r#"{"binding_policy": "single", "logging": {"json": true}}"#)
                .unwrap();
        assert_eq!(config.binding_policy, BindingPolicy::Single);
        assert!(config.logging.json);
        assert!(config.parallel_build);
    }
}
