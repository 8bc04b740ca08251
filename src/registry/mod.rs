//! # Registry Infrastructure
//!
//! Build-time pipeline that turns type universes into the frozen
//! [`DispatchRegistry`].
//!
//! ## Architecture
//!
//! ```text
//! Registry Infrastructure
//! ├── TypeUniverse / HandlerType   (explicit registration manifests)
//! ├── TypeScanner                  (signal + handler discovery)
//! ├── HandlerBinder                (capability -> binding, grouped by signal)
//! ├── InvokerCompiler              (binding -> precompiled Invoker)
//! └── DispatchRegistry             (frozen TypeId -> [Invoker] map)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use signal_dispatch::config::DispatchConfig;
//! use signal_dispatch::registry::{DispatchRegistry, TypeUniverse};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let universes = vec![TypeUniverse::new("billing"), TypeUniverse::new("accounts")];
//! let registry = DispatchRegistry::build(&universes, &DispatchConfig::default())?;
//! assert!(registry.is_empty());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod binder;
pub mod dispatch_registry;
pub mod invoker;
pub mod scanner;
pub mod universe;

pub use binder::{Binding, BindingGroup, BindingPolicy, HandlerBinder};
pub use dispatch_registry::{DispatchRegistry, RegistryStats};
pub use invoker::{InvocationResult, Invoker, InvokerCompiler};
pub use scanner::{ScanResult, TypeScanner};
pub use universe::{Capability, CapabilityShape, HandlerDescriptor, HandlerType, TypeUniverse};
