//! # Handler Binder
//!
//! Turns scanned handler descriptors into bindings grouped by signal type.
//!
//! ## Binding Policies
//!
//! | Policy | Handlers per signal | Capabilities per handler |
//! |--------|---------------------|--------------------------|
//! | [`BindingPolicy::FanOut`] | any | any |
//! | [`BindingPolicy::Single`] | at most one | at most one |
//!
//! The binder rejects single-mode handlers with several capabilities. The
//! one-handler-per-signal rule is enforced when each group is compiled, see
//! [`InvokerCompiler::compile_group`](super::InvokerCompiler::compile_group).
//!
//! Groups keep the order in which their signal was first seen, and bindings
//! inside a group keep handler traversal order.

use super::invoker::InvokeFn;
use super::universe::{Capability, HandlerDescriptor};
use crate::error::{BuildError, BuildResult};
use crate::signal::TypeKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// How many handlers a signal type may be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingPolicy {
    /// One handler per signal; dispatch yields a single optional result.
    Single,
    /// Any number of handlers per signal; dispatch yields one result per handler.
    #[default]
    FanOut,
}

impl fmt::Display for BindingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingPolicy::Single => write!(f, "single"),
            BindingPolicy::FanOut => write!(f, "fan_out"),
        }
    }
}

/// One accepted `(handler, signal, result)` binding.
#[derive(Clone, Copy)]
pub struct Binding {
    handler: TypeKey,
    signal: TypeKey,
    result: Option<TypeKey>,
    entry: InvokeFn,
}

impl Binding {
    pub(crate) fn from_capability(handler: TypeKey, capability: &Capability) -> Self {
        Self {
            handler,
            signal: capability.signal(),
            result: capability.result(),
            entry: capability.entry(),
        }
    }

    pub fn handler(&self) -> TypeKey {
        self.handler
    }

    pub fn signal(&self) -> TypeKey {
        self.signal
    }

    pub fn result(&self) -> Option<TypeKey> {
        self.result
    }

    pub(crate) fn entry(&self) -> InvokeFn {
        self.entry
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("handler", &self.handler)
            .field("signal", &self.signal)
            .field("result", &self.result)
            .finish()
    }
}

/// All bindings for one signal type, in binding order.
#[derive(Debug, Clone)]
pub struct BindingGroup {
    signal: TypeKey,
    bindings: Vec<Binding>,
}

impl BindingGroup {
    pub fn signal(&self) -> TypeKey {
        self.signal
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HandlerBinder {
    policy: BindingPolicy,
}

impl HandlerBinder {
    pub fn new(policy: BindingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> BindingPolicy {
        self.policy
    }

    /// Bind every capability of every handler, grouped by signal type.
    pub fn bind<'u, I>(&self, handlers: I) -> BuildResult<Vec<BindingGroup>>
    where
        I: IntoIterator<Item = &'u HandlerDescriptor>,
    {
        let mut groups: Vec<BindingGroup> = Vec::new();
        let mut positions: HashMap<TypeKey, usize> = HashMap::new();

        for descriptor in handlers {
            if self.policy == BindingPolicy::Single && descriptor.capabilities().len() > 1 {
                return Err(BuildError::MultipleHandlerCapabilities {
                    handler: descriptor.handler().name(),
                    signals: descriptor
                        .capabilities()
                        .iter()
                        .map(|c| c.signal().name())
                        .collect(),
                });
            }

            for capability in descriptor.capabilities() {
                let binding = Binding::from_capability(descriptor.handler(), capability);
                trace!(
                    handler = binding.handler().name(),
                    signal = binding.signal().name(),
                    result = binding.result().map(|r| r.name()),
                    "Bound handler capability"
                );

                let position = *positions.entry(binding.signal()).or_insert_with(|| {
                    groups.push(BindingGroup {
                        signal: binding.signal(),
                        bindings: Vec::new(),
                    });
                    groups.len() - 1
                });
                groups[position].bindings.push(binding);
            }
        }

        Ok(groups)
    }
}
