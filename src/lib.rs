#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Signal Dispatch
//!
//! In-process typed signal dispatcher with a frozen, precompiled handler registry.
//!
//! ## Overview
//!
//! Application code sends a *signal* (a command, event or query value) and the
//! dispatcher routes it to every handler registered for the signal's concrete
//! type, constructing each handler through a pluggable construction context and
//! releasing it once handling is done.
//!
//! ## Architecture
//!
//! All type analysis happens once, at startup. Handler types are declared in
//! [`TypeUniverse`] manifests; the registry scans them, binds each handler
//! capability to its signal type, and compiles one [`Invoker`](registry::Invoker)
//! per binding. After the build the registry is frozen, so dispatch is a map
//! lookup followed by direct calls with no locking.
//!
//! ## Key Features
//!
//! - **Two Binding Policies**: single-result (one handler per signal) and
//!   fan-out (any number of handlers, results in registration order)
//! - **Cooperative Cancellation**: one `CancellationToken` reaches every handler
//! - **Scoped Handlers**: a fresh handler per invocation, released on every exit path
//! - **Parallel Build**: universes are scanned and compiled on the rayon pool
//!
//! ## Module Organization
//!
//! - [`signal`] - Signal marker trait, type keys and type-erased results
//! - [`handler`] - Handler capabilities
//! - [`context`] - Construction context and the built-in service container
//! - [`registry`] - Scanner, binder, invoker compiler and the frozen registry
//! - [`dispatcher`] - The dispatch facade
//! - [`bootstrap`] - Composition root
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use async_trait::async_trait;
//! use signal_dispatch::config::DispatchConfig;
//! use signal_dispatch::{
//!     CancellationToken, ConstructionContext, DispatchSystem, Handler, HandlerResult,
//!     HandlerType, ServiceContainer, Signal, SignalHandler, TypeUniverse,
//! };
//! use std::sync::Arc;
//!
//! struct OrderPlaced {
//!     order_id: u64,
//! }
//! impl Signal for OrderPlaced {}
//!
//! #[derive(Default)]
//! struct SendReceipt;
//! impl Handler for SendReceipt {}
//!
//! #[async_trait]
//! impl SignalHandler<OrderPlaced> for SendReceipt {
//!     async fn handle(&self, signal: &OrderPlaced, _cancel: CancellationToken) -> HandlerResult<()> {
//!         println!("receipt for order {}", signal.order_id);
//!         Ok(())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let universe = TypeUniverse::new("orders")
//!     .signal::<OrderPlaced>()
//!     .handler(HandlerType::<SendReceipt>::new().handles::<OrderPlaced>());
//! let context: Arc<dyn ConstructionContext> =
//!     Arc::new(ServiceContainer::new().add_default::<SendReceipt>());
//!
//! let system = DispatchSystem::bootstrap(DispatchConfig::default(), &[universe], context).unwrap();
//! let results = system
//!     .dispatcher()
//!     .send(OrderPlaced { order_id: 7 }, CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert_eq!(results.len(), 1);
//! # });
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and doc tests
//! ```

pub mod bootstrap;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod logging;
pub mod registry;
pub mod signal;

pub use bootstrap::DispatchSystem;
pub use config::{ConfigLoader, ConfigurationError, DispatchConfig, LoggingConfig};
pub use context::{ConstructionContext, ContextExt, Lifetime, ServiceContainer};
pub use dispatcher::{Dispatcher, FanOutStrategy};
pub use error::{
    BuildError, BuildResult, ConstructionError, DispatchError, DispatchResult,
};
pub use handler::{Handler, HandlerResult, ResultHandler, SignalHandler};
pub use registry::{BindingPolicy, DispatchRegistry, HandlerType, RegistryStats, TypeUniverse};
pub use signal::{HandlerOutput, Signal, TypeKey};

pub use tokio_util::sync::CancellationToken;
