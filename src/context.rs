//! # Construction Context
//!
//! The dispatcher never builds handlers itself. It asks a
//! [`ConstructionContext`] for an instance of the handler type, and the context
//! resolves whatever that type depends on.
//!
//! [`ServiceContainer`] is a small context implementation for applications that
//! have no container of their own, and for tests.
//!
//! ```rust
//! use signal_dispatch::{ConstructionContext, ContextExt, ServiceContainer};
//! use std::sync::Arc;
//!
//! struct Clock;
//! struct Greeter {
//!     clock: Arc<Clock>,
//! }
//!
//! let container = ServiceContainer::new()
//!     .add_instance(Arc::new(Clock))
//!     .add_transient(|ctx: &dyn ConstructionContext| {
//!         Ok(Greeter { clock: ctx.resolve::<Arc<Clock>>()? })
//!     });
//!
//! let greeter: Greeter = container.resolve().unwrap();
//! # let _ = greeter.clock;
//! ```

use crate::error::ConstructionError;
use crate::signal::TypeKey;
use parking_lot::Mutex;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::trace;

/// Capability that produces an instance of a requested type.
///
/// Implementations must be safe for concurrent resolution: one context is
/// shared by every invocation of a dispatch, and possibly by concurrent
/// dispatches.
pub trait ConstructionContext: Send + Sync {
    /// Produce a new instance of `key`, boxed as `Any`.
    ///
    /// The returned box must hold a value of exactly the requested type.
    fn resolve_any(&self, key: TypeKey) -> Result<Box<dyn Any + Send>, ConstructionError>;
}

/// Typed convenience over [`ConstructionContext::resolve_any`].
pub trait ContextExt {
    fn resolve<T: Send + 'static>(&self) -> Result<T, ConstructionError>;
}

impl<C: ConstructionContext + ?Sized> ContextExt for C {
    fn resolve<T: Send + 'static>(&self) -> Result<T, ConstructionError> {
        let key = TypeKey::of::<T>();
        let instance = self.resolve_any(key)?;
        instance
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| ConstructionError::TypeMismatch {
                expected: key.name(),
                actual: "<other>",
            })
    }
}

impl<C: ConstructionContext + ?Sized> ConstructionContext for Arc<C> {
    fn resolve_any(&self, key: TypeKey) -> Result<Box<dyn Any + Send>, ConstructionError> {
        (**self).resolve_any(key)
    }
}

type Factory = Box<
    dyn Fn(&dyn ConstructionContext) -> Result<Box<dyn Any + Send>, ConstructionError>
        + Send
        + Sync,
>;

struct SingletonCell<T> {
    value: Option<Arc<T>>,
    /// Threads currently running the factory.
    building: Vec<ThreadId>,
}

struct Registration {
    type_name: &'static str,
    lifetime: Lifetime,
    factory: Factory,
}

/// How a registered type is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// A new instance per resolution.
    Transient,
    /// A clone of one stored value per resolution.
    Instance,
    /// One lazily built `Arc<T>` shared by every resolution.
    Singleton,
}

/// Minimal type-map container implementing [`ConstructionContext`].
///
/// Registrations are made up front with the builder methods; afterwards the
/// container is only read, except for lazily built singletons.
#[derive(Default)]
pub struct ServiceContainer {
    registrations: HashMap<TypeId, Registration>,
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory producing a fresh `T` for every resolution.
    ///
    /// The factory receives the container so it can resolve `T`'s own dependencies.
    pub fn add_transient<T, F>(self, factory: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&dyn ConstructionContext) -> Result<T, ConstructionError> + Send + Sync + 'static,
    {
        self.register::<T>(
            Lifetime::Transient,
            Box::new(move |ctx: &dyn ConstructionContext| {
                factory(ctx).map(|value| Box::new(value) as Box<dyn Any + Send>)
            }),
        )
    }

    /// Register `T::default()` as the factory for `T`.
    pub fn add_default<T: Default + Send + 'static>(self) -> Self {
        self.add_transient(|_| Ok(T::default()))
    }

    /// Register a value that is cloned on every resolution (typically an `Arc`).
    pub fn add_instance<T: Clone + Send + Sync + 'static>(self, value: T) -> Self {
        self.register::<T>(
            Lifetime::Instance,
            Box::new(move |_: &dyn ConstructionContext| {
                Ok(Box::new(value.clone()) as Box<dyn Any + Send>)
            }),
        )
    }

    /// Register a factory whose result is shared by every resolution of `Arc<T>`.
    ///
    /// The factory runs outside the lock; when two threads race, the first
    /// installed value wins. A factory that resolves `Arc<T>` again on the same
    /// thread fails with [`ConstructionError::Cycle`].
    pub fn add_singleton<T, F>(self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&dyn ConstructionContext) -> Result<T, ConstructionError> + Send + Sync + 'static,
    {
        let cell: Mutex<SingletonCell<T>> = Mutex::new(SingletonCell {
            value: None,
            building: Vec::new(),
        });
        self.register::<Arc<T>>(
            Lifetime::Singleton,
            Box::new(move |ctx: &dyn ConstructionContext| {
                let current = thread::current().id();
                {
                    let mut state = cell.lock();
                    if let Some(existing) = &state.value {
                        return Ok(Box::new(Arc::clone(existing)) as Box<dyn Any + Send>);
                    }
                    if state.building.contains(&current) {
                        return Err(ConstructionError::Cycle {
                            type_name: type_name::<T>(),
                        });
                    }
                    state.building.push(current);
                }

                let built = factory(ctx);

                let mut state = cell.lock();
                state.building.retain(|id| *id != current);
                let created = Arc::new(built?);
                let shared = Arc::clone(state.value.get_or_insert(created));
                Ok(Box::new(shared) as Box<dyn Any + Send>)
            }),
        )
    }

    fn register<T: 'static>(mut self, lifetime: Lifetime, factory: Factory) -> Self {
        let key = TypeKey::of::<T>();
        self.registrations.insert(
            key.id(),
            Registration {
                type_name: key.name(),
                lifetime,
                factory,
            },
        );
        self
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.registrations.contains_key(&TypeId::of::<T>())
    }

    pub fn lifetime_of<T: 'static>(&self) -> Option<Lifetime> {
        self.registrations
            .get(&TypeId::of::<T>())
            .map(|registration| registration.lifetime)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl ConstructionContext for ServiceContainer {
    fn resolve_any(&self, key: TypeKey) -> Result<Box<dyn Any + Send>, ConstructionError> {
        let registration = self
            .registrations
            .get(&key.id())
            .ok_or(ConstructionError::NotRegistered {
                type_name: key.name(),
            })?;

        trace!(
            type_name = registration.type_name,
            lifetime = ?registration.lifetime,
            "Resolving instance"
        );
        (registration.factory)(self)
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self
            .registrations
            .values()
            .map(|registration| registration.type_name)
            .collect();
        names.sort_unstable();
        f.debug_struct("ServiceContainer")
            .field("registrations", &names)
            .finish()
    }
}
