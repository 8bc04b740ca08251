//! # Type Universes
//!
//! A [`TypeUniverse`] is the explicit manifest a module or library publishes
//! so the registry can discover its signals and handlers at startup. Each
//! handler registration names the capabilities it provides; the trait bounds
//! on [`HandlerType::handles`] and [`HandlerType::answers`] make sure the
//! handler really implements them.
//!
//! ```rust
//! use async_trait::async_trait;
//! use signal_dispatch::{Handler, HandlerResult, HandlerType, Signal, SignalHandler, TypeUniverse};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Ping;
//! impl Signal for Ping {}
//!
//! #[derive(Default)]
//! struct LogPing;
//! impl Handler for LogPing {}
//!
//! #[async_trait]
//! impl SignalHandler<Ping> for LogPing {
//!     async fn handle(&self, _signal: &Ping, _cancel: CancellationToken) -> HandlerResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! let universe = TypeUniverse::new("diagnostics")
//!     .signal::<Ping>()
//!     .handler(HandlerType::<LogPing>::new().handles::<Ping>());
//!
//! assert_eq!(universe.handlers().len(), 1);
//! ```

use super::invoker::{invoke_no_result, invoke_with_result, InvokeFn};
use crate::handler::{Handler, ResultHandler, SignalHandler};
use crate::signal::{Signal, TypeKey};
use std::fmt;
use std::marker::PhantomData;

/// Which handling shape a capability has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityShape {
    /// [`SignalHandler`]: handles the signal, produces no value.
    NoResult,
    /// [`ResultHandler`]: handles the signal, produces a value of the given type.
    WithResult(TypeKey),
}

/// One handler capability: a signal type, its shape, and the monomorphized entry point.
#[derive(Clone, Copy)]
pub struct Capability {
    signal: TypeKey,
    shape: CapabilityShape,
    entry: InvokeFn,
}

impl Capability {
    pub fn signal(&self) -> TypeKey {
        self.signal
    }

    pub fn shape(&self) -> CapabilityShape {
        self.shape
    }

    pub fn result(&self) -> Option<TypeKey> {
        match self.shape {
            CapabilityShape::NoResult => None,
            CapabilityShape::WithResult(result) => Some(result),
        }
    }

    pub(crate) fn entry(&self) -> InvokeFn {
        self.entry
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("signal", &self.signal)
            .field("shape", &self.shape)
            .finish()
    }
}

/// Typed registration builder for handler `H`.
pub struct HandlerType<H> {
    capabilities: Vec<Capability>,
    _handler: PhantomData<fn() -> H>,
}

impl<H: Handler> HandlerType<H> {
    pub fn new() -> Self {
        Self {
            capabilities: Vec::new(),
            _handler: PhantomData,
        }
    }

    /// Register `H` as a no-result handler for `S`.
    #[must_use]
    pub fn handles<S: Signal>(self) -> Self
    where
        H: SignalHandler<S>,
    {
        self.with_capability(Capability {
            signal: TypeKey::of::<S>(),
            shape: CapabilityShape::NoResult,
            entry: invoke_no_result::<H, S>,
        })
    }

    /// Register `H` as a value-returning handler for `S`.
    #[must_use]
    pub fn answers<S: Signal>(self) -> Self
    where
        H: ResultHandler<S>,
    {
        self.with_capability(Capability {
            signal: TypeKey::of::<S>(),
            shape: CapabilityShape::WithResult(TypeKey::of::<<H as ResultHandler<S>>::Output>()),
            entry: invoke_with_result::<H, S>,
        })
    }

    fn with_capability(mut self, capability: Capability) -> Self {
        push_unique(&mut self.capabilities, capability);
        self
    }

    pub fn into_descriptor(self) -> HandlerDescriptor {
        HandlerDescriptor {
            handler: TypeKey::of::<H>(),
            capabilities: self.capabilities,
        }
    }
}

impl<H: Handler> Default for HandlerType<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handler> From<HandlerType<H>> for HandlerDescriptor {
    fn from(handler: HandlerType<H>) -> Self {
        handler.into_descriptor()
    }
}

/// Type-erased description of a registered handler type and its capabilities.
#[derive(Debug, Clone)]
pub struct HandlerDescriptor {
    handler: TypeKey,
    capabilities: Vec<Capability>,
}

impl HandlerDescriptor {
    pub fn handler(&self) -> TypeKey {
        self.handler
    }

    /// Capabilities in registration order.
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Whether the type implements at least one recognized capability.
    pub fn is_handler(&self) -> bool {
        !self.capabilities.is_empty()
    }

    /// Append the capabilities of another registration of the same handler type.
    pub(crate) fn merge(&mut self, other: &HandlerDescriptor) {
        debug_assert_eq!(self.handler, other.handler);
        for capability in &other.capabilities {
            push_unique(&mut self.capabilities, *capability);
        }
    }
}

fn push_unique(capabilities: &mut Vec<Capability>, capability: Capability) {
    let known = capabilities
        .iter()
        .any(|c| c.signal == capability.signal && c.shape == capability.shape);
    if !known {
        capabilities.push(capability);
    }
}

/// Named manifest of signal and handler types.
#[derive(Debug, Clone)]
pub struct TypeUniverse {
    name: String,
    signals: Vec<TypeKey>,
    handlers: Vec<HandlerDescriptor>,
}

impl TypeUniverse {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signals: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Declare a signal type.
    #[must_use]
    pub fn signal<S: Signal>(mut self) -> Self {
        let key = TypeKey::of::<S>();
        if !self.signals.contains(&key) {
            self.signals.push(key);
        }
        self
    }

    /// Register a handler type with its capabilities.
    #[must_use]
    pub fn handler(mut self, handler: impl Into<HandlerDescriptor>) -> Self {
        self.handlers.push(handler.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signals(&self) -> &[TypeKey] {
        &self.signals
    }

    pub fn handlers(&self) -> &[HandlerDescriptor] {
        &self.handlers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerResult;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct Ping;
    impl Signal for Ping {}

    struct Lookup;
    impl Signal for Lookup {}

    struct Multi;
    impl Handler for Multi {}

    #[async_trait]
    impl SignalHandler<Ping> for Multi {
        async fn handle(&self, _signal: &Ping, _cancel: CancellationToken) -> HandlerResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl ResultHandler<Lookup> for Multi {
        type Output = String;

        async fn handle(
            &self,
            _signal: &Lookup,
            _cancel: CancellationToken,
        ) -> HandlerResult<String> {
            Ok("found".to_string())
        }
    }

    struct Inert;
    impl Handler for Inert {}

    #[test]
    fn test_capabilities_follow_registration_order() {
        let descriptor = HandlerType::<Multi>::new()
            .answers::<Lookup>()
            .handles::<Ping>()
            .into_descriptor();

        let signals: Vec<TypeKey> =
            descriptor.capabilities().iter().map(Capability::signal).collect();
        assert_eq!(signals, vec![TypeKey::of::<Lookup>(), TypeKey::of::<Ping>()]);
        assert_eq!(descriptor.capabilities()[0].result(), Some(TypeKey::of::<String>()));
        assert_eq!(descriptor.capabilities()[1].shape(), CapabilityShape::NoResult);
    }

    #[test]
    fn test_repeated_capability_is_recorded_once() {
        let descriptor = HandlerType::<Multi>::new()
            .handles::<Ping>()
            .handles::<Ping>()
            .into_descriptor();
        assert_eq!(descriptor.capabilities().len(), 1);
    }

    #[test]
    fn test_type_without_capabilities_is_not_a_handler() {
        let descriptor = HandlerType::<Inert>::new().into_descriptor();
        assert!(!descriptor.is_handler());
    }

    #[test]
    fn test_universe_collects_signals_and_handlers() {
        let universe = TypeUniverse::new("accounts")
            .signal::<Ping>()
            .signal::<Ping>()
            .signal::<Lookup>()
            .handler(HandlerType::<Multi>::new().handles::<Ping>());

        assert_eq!(universe.name(), "accounts");
        assert_eq!(universe.signals().len(), 2);
        assert_eq!(universe.handlers()[0].handler(), TypeKey::of::<Multi>());
    }
}
