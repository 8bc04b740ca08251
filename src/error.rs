//! Error types for registry construction and signal dispatch.
//!
//! - [`BuildError`] is raised while the registry is being built and is fatal to
//!   the build: no partially populated registry is ever returned.
//! - [`DispatchError`] is raised by [`Dispatcher`](crate::Dispatcher) calls and
//!   surfaces to the immediate caller.
//! - [`ConstructionError`] is produced by a
//!   [`ConstructionContext`](crate::ConstructionContext) that cannot build an
//!   instance.

use crate::config::ConfigurationError;
use thiserror::Error;

/// Errors produced while building a [`DispatchRegistry`](crate::DispatchRegistry).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BuildError {
    /// More than one handler is bound to a signal type in single-result mode.
    #[error("signal type {signal} has {} bound handlers in single-result mode: {handlers:?}", .handlers.len())]
    DuplicateHandlerBinding {
        signal: &'static str,
        handlers: Vec<&'static str>,
    },

    /// A handler type carries more than one capability in single-result mode.
    #[error("handler type {handler} implements several handler capabilities in single-result mode: {signals:?}")]
    MultipleHandlerCapabilities {
        handler: &'static str,
        signals: Vec<&'static str>,
    },

    /// A handler is bound to a signal type no universe declared.
    #[error("handler {handler} is bound to undeclared signal type {signal}")]
    UndeclaredSignalType {
        signal: &'static str,
        handler: &'static str,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

impl BuildError {
    /// Stable snake_case label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BuildError::DuplicateHandlerBinding { .. } => "build_duplicate_handler_binding",
            BuildError::MultipleHandlerCapabilities { .. } => "build_multiple_handler_capabilities",
            BuildError::UndeclaredSignalType { .. } => "build_undeclared_signal_type",
            BuildError::Configuration(_) => "build_configuration",
        }
    }
}

/// Errors raised by a construction context.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("no registration for type {type_name}")]
    NotRegistered { type_name: &'static str },

    #[error("factory for {type_name} failed: {source}")]
    Factory {
        type_name: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The type's factory resolved the type again while it was being built.
    #[error("cyclic resolution of {type_name}")]
    Cycle { type_name: &'static str },

    /// The context returned an instance of a different type than requested.
    #[error("context produced {actual} when {expected} was requested")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors produced while dispatching a signal.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The registry has no entry for the signal's type.
    #[error("no handlers registered for signal type {signal}")]
    UnregisteredSignalType { signal: &'static str },

    #[error("failed to construct handler {handler} for {signal}: {source}")]
    HandlerConstructionFailure {
        handler: &'static str,
        signal: &'static str,
        #[source]
        source: ConstructionError,
    },

    #[error("handler {handler} failed while handling {signal}: {source}")]
    HandlerExecutionFailure {
        handler: &'static str,
        signal: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// An invoker was called with a signal of another type.
    #[error("invoker expected signal {expected}, got {actual}")]
    SignalTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A single-result call hit a signal type bound to several handlers.
    #[error("single-result dispatch of {signal} is ambiguous: {handlers:?}")]
    AmbiguousDispatch {
        signal: &'static str,
        handlers: Vec<&'static str>,
    },

    #[error("handler for {signal} produced no value")]
    NoResult { signal: &'static str },

    #[error("handler for {signal} produced {actual}, expected {expected}")]
    ResultTypeMismatch {
        signal: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
}

impl DispatchError {
    /// Stable snake_case label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::UnregisteredSignalType { .. } => "dispatch_unregistered_signal_type",
            DispatchError::HandlerConstructionFailure { .. } => {
                "dispatch_handler_construction_failure"
            }
            DispatchError::HandlerExecutionFailure { .. } => "dispatch_handler_execution_failure",
            DispatchError::SignalTypeMismatch { .. } => "dispatch_signal_type_mismatch",
            DispatchError::AmbiguousDispatch { .. } => "dispatch_ambiguous",
            DispatchError::NoResult { .. } => "dispatch_no_result",
            DispatchError::ResultTypeMismatch { .. } => "dispatch_result_type_mismatch",
        }
    }

    /// True when the signal simply had no handlers; callers may treat this as a no-op.
    pub fn is_unregistered(&self) -> bool {
        matches!(self, DispatchError::UnregisteredSignalType { .. })
    }

    /// The handler's own error, when the failure came from handler logic.
    pub fn handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            DispatchError::HandlerExecutionFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
