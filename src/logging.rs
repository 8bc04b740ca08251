//! # Structured Logging Module
//!
//! Environment-aware structured logging for registry builds and dispatches.
//! Console output is human-readable by default and JSON lines when
//! [`LoggingConfig::json`] is set. `RUST_LOG` always wins over the
//! configured level.

use crate::config::loader::detect_environment;
use crate::config::LoggingConfig;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with the default configuration.
pub fn init_structured_logging() {
    init_structured_logging_with(&LoggingConfig::default());
}

/// Initialize structured logging once per process.
///
/// Later calls are no-ops, and an already-installed global subscriber is
/// left in place.
pub fn init_structured_logging_with(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = config
            .level
            .clone()
            .unwrap_or_else(|| get_log_level(&environment));
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

        let layer = if config.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            level = %log_level,
            json = config.json,
            "STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
pub fn get_environment() -> String {
    detect_environment()
}

/// Get log level based on environment
pub fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for registry operations
pub fn log_registry_operation(
    operation: &str,
    generation: Option<&str>,
    signal_types: usize,
    invokers: usize,
    status: &str,
) {
    tracing::info!(
        operation = %operation,
        generation = generation,
        signal_types = signal_types,
        invokers = invokers,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "REGISTRY_OPERATION"
    );
}

/// Log structured data for dispatch operations
pub fn log_dispatch_operation(
    operation: &str,
    dispatch_id: &str,
    signal: &str,
    handlers: usize,
    status: &str,
    duration_us: Option<u64>,
) {
    tracing::debug!(
        operation = %operation,
        dispatch_id = %dispatch_id,
        signal = %signal,
        handlers = handlers,
        status = %status,
        duration_us = duration_us,
        timestamp = %Utc::now().to_rfc3339(),
        "DISPATCH_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging_with(&LoggingConfig {
            json: true,
            level: Some("trace".to_string()),
        });
        log_registry_operation("build", None, 0, 0, "frozen");
        log_dispatch_operation("send", "test", "Ping", 1, "completed", Some(3));
    }
}
