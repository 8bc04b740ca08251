//! # Dispatch Registry
//!
//! The immutable signal type -> invokers map consulted by every dispatch.
//!
//! ## Build Pipeline
//!
//! ```text
//! &[TypeUniverse]
//!   ├─► TypeScanner::scan()          (rayon, ordered)
//!   ├─► HandlerBinder::bind()        (groups by signal type)
//!   ├─► validate declared signals    (optional)
//!   ├─► InvokerCompiler per group    (rayon, into a DashMap)
//!   └─► freeze into HashMap          (read-only from here on)
//! ```
//!
//! Any failure aborts the build; callers never observe a partial registry.
//! Once built, the registry has no interior mutability and can be shared
//! through an `Arc` by any number of concurrent dispatches.

use super::binder::{BindingGroup, BindingPolicy, HandlerBinder};
use super::invoker::{Invoker, InvokerCompiler};
use super::scanner::TypeScanner;
use super::universe::TypeUniverse;
use crate::config::DispatchConfig;
use crate::error::{BuildError, BuildResult};
use crate::logging::log_registry_operation;
use crate::signal::{Signal, TypeKey};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rayon::prelude::*;
use serde::Serialize;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Frozen mapping from signal type to its ordered invokers.
#[derive(Debug)]
pub struct DispatchRegistry {
    invokers: HashMap<TypeId, Box<[Invoker]>>,
    policy: BindingPolicy,
    generation: Uuid,
    built_at: DateTime<Utc>,
}

/// Summary of a built registry.
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub generation: Uuid,
    pub policy: BindingPolicy,
    pub signal_types: usize,
    pub total_invokers: usize,
    pub max_fan_out: usize,
    pub built_at: DateTime<Utc>,
}

impl DispatchRegistry {
    /// Scan, bind, and compile `universes` into a frozen registry.
    pub fn build(universes: &[TypeUniverse], config: &DispatchConfig) -> BuildResult<Self> {
        config.validate()?;
        let started = Instant::now();

        let scan = TypeScanner::new(universes)
            .with_parallelism(config.parallel_build)
            .scan();
        let groups =
            HandlerBinder::new(config.binding_policy).bind(scan.handlers.iter())?;

        if config.validate_signals {
            validate_declared_signals(&groups, &scan.signals)?;
        }

        let compiler = InvokerCompiler::new(config.binding_policy)
            .with_instrumentation(config.instrument_invocations);
        let accumulator: DashMap<TypeId, Box<[Invoker]>> = DashMap::with_capacity(groups.len());
        let compile_group = |group: &BindingGroup| -> BuildResult<()> {
            let invokers = compiler.compile_group(group)?;
            accumulator.insert(group.signal().id(), invokers);
            Ok(())
        };

        let compiled = if config.parallel_build {
            groups.par_iter().try_for_each(compile_group)
        } else {
            groups.iter().try_for_each(compile_group)
        };
        if let Err(error) = compiled {
            warn!(
                error = %error,
                label = error.as_label(),
                "Dispatch registry build failed"
            );
            return Err(error);
        }

        let registry = Self {
            invokers: accumulator.into_iter().collect(),
            policy: config.binding_policy,
            generation: Uuid::new_v4(),
            built_at: Utc::now(),
        };

        let stats = registry.stats();
        info!(
            generation = %stats.generation,
            policy = %stats.policy,
            signal_types = stats.signal_types,
            total_invokers = stats.total_invokers,
            max_fan_out = stats.max_fan_out,
            elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            "Dispatch registry built"
        );
        log_registry_operation(
            "build",
            Some(&stats.generation.to_string()),
            stats.signal_types,
            stats.total_invokers,
            "frozen",
        );

        Ok(registry)
    }

    /// An empty registry: every dispatch fails with `UnregisteredSignalType`.
    pub fn empty(policy: BindingPolicy) -> Self {
        Self {
            invokers: HashMap::new(),
            policy,
            generation: Uuid::new_v4(),
            built_at: Utc::now(),
        }
    }

    pub fn invokers_for(&self, signal: TypeId) -> Option<&[Invoker]> {
        self.invokers.get(&signal).map(|invokers| &invokers[..])
    }

    pub fn invokers_of<S: Signal>(&self) -> Option<&[Invoker]> {
        self.invokers_for(TypeId::of::<S>())
    }

    pub fn contains<S: Signal>(&self) -> bool {
        self.invokers.contains_key(&TypeId::of::<S>())
    }

    /// Number of signal types with at least one invoker.
    pub fn len(&self) -> usize {
        self.invokers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invokers.is_empty()
    }

    /// Registered signal types, in no particular order.
    pub fn signal_types(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.invokers
            .values()
            .filter_map(|invokers| invokers.first().map(Invoker::signal))
    }

    pub fn policy(&self) -> BindingPolicy {
        self.policy
    }

    /// Identifier of this build, for correlating logs across rebuilds.
    pub fn generation(&self) -> Uuid {
        self.generation
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            generation: self.generation,
            policy: self.policy,
            signal_types: self.invokers.len(),
            total_invokers: self.invokers.values().map(|invokers| invokers.len()).sum(),
            max_fan_out: self
                .invokers
                .values()
                .map(|invokers| invokers.len())
                .max()
                .unwrap_or(0),
            built_at: self.built_at,
        }
    }
}

fn validate_declared_signals(groups: &[BindingGroup], declared: &[TypeKey]) -> BuildResult<()> {
    let declared: HashSet<TypeKey> = declared.iter().copied().collect();
    for group in groups {
        if !declared.contains(&group.signal()) {
            let handler = group
                .bindings()
                .first()
                .map(|binding| binding.handler().name())
                .unwrap_or("<none>");
            return Err(BuildError::UndeclaredSignalType {
                signal: group.signal().name(),
                handler,
            });
        }
    }
    Ok(())
}
