//! # Dispatch System Bootstrap
//!
//! Composition root: builds the registry once at startup and hands out
//! [`Dispatcher`]s that share it.
//!
//! ## Key Features
//!
//! - **Configuration-Driven**: policy, build parallelism and fan-out strategy
//!   come from [`DispatchConfig`]
//! - **Build Once**: the frozen registry is shared through an `Arc`
//! - **Request Scopes**: [`DispatchSystem::dispatcher_with_context`] binds a
//!   per-request construction context to the same registry

use crate::config::{ConfigLoader, DispatchConfig};
use crate::context::ConstructionContext;
use crate::dispatcher::Dispatcher;
use crate::error::BuildResult;
use crate::logging::{init_structured_logging_with, log_error};
use crate::registry::{DispatchRegistry, RegistryStats, TypeUniverse};
use std::sync::Arc;
use tracing::info;

/// Shared handle to a built registry plus the application context.
#[derive(Clone)]
pub struct DispatchSystem {
    registry: Arc<DispatchRegistry>,
    context: Arc<dyn ConstructionContext>,
    config: Arc<DispatchConfig>,
}

impl DispatchSystem {
    /// Build the registry for `universes` and bind it to `context`.
    pub fn bootstrap(
        config: DispatchConfig,
        universes: &[TypeUniverse],
        context: Arc<dyn ConstructionContext>,
    ) -> BuildResult<Self> {
        info!(
            universes = universes.len(),
            policy = %config.binding_policy,
            strategy = %config.fan_out_strategy,
            "Bootstrapping dispatch system"
        );

        let registry = DispatchRegistry::build(universes, &config).map_err(|error| {
            log_error("bootstrap", "build_registry", &error.to_string(), Some(error.as_label()));
            error
        })?;

        Ok(Self {
            registry: Arc::new(registry),
            context,
            config: Arc::new(config),
        })
    }

    /// Load configuration through [`ConfigLoader`], initialize logging, and
    /// bootstrap with it.
    pub fn bootstrap_from_environment(
        universes: &[TypeUniverse],
        context: Arc<dyn ConstructionContext>,
    ) -> BuildResult<Self> {
        let config = ConfigLoader::new().load()?;
        init_structured_logging_with(&config.logging);
        Self::bootstrap(config, universes, context)
    }

    /// Dispatcher over the application-wide context.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher_with_context(Arc::clone(&self.context))
    }

    /// Dispatcher over a request-scoped context.
    pub fn dispatcher_with_context(&self, context: Arc<dyn ConstructionContext>) -> Dispatcher {
        Dispatcher::new(context, Arc::clone(&self.registry))
            .with_fan_out_strategy(self.config.fan_out_strategy)
    }

    pub fn registry(&self) -> &Arc<DispatchRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }
}

impl std::fmt::Debug for DispatchSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchSystem")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
