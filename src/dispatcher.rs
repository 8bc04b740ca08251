//! # Dispatch Facade
//!
//! [`Dispatcher`] is the per-request entry point: it looks a signal's type up
//! in the frozen [`DispatchRegistry`] and runs the precompiled invokers
//! against its [`ConstructionContext`].
//!
//! ```rust
//! use async_trait::async_trait;
//! use signal_dispatch::config::DispatchConfig;
//! use signal_dispatch::{
//!     CancellationToken, DispatchRegistry, Dispatcher, Handler, HandlerResult, HandlerType,
//!     ResultHandler, ServiceContainer, Signal, TypeUniverse,
//! };
//! use std::sync::Arc;
//!
//! struct Add(i32, i32);
//! impl Signal for Add {}
//!
//! #[derive(Default)]
//! struct Calculator;
//! impl Handler for Calculator {}
//!
//! #[async_trait]
//! impl ResultHandler<Add> for Calculator {
//!     type Output = i32;
//!
//!     async fn handle(&self, signal: &Add, _cancel: CancellationToken) -> HandlerResult<i32> {
//!         Ok(signal.0 + signal.1)
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let universe = TypeUniverse::new("math")
//!     .signal::<Add>()
//!     .handler(HandlerType::<Calculator>::new().answers::<Add>());
//! let registry = DispatchRegistry::build(&[universe], &DispatchConfig::single()).unwrap();
//! let context = ServiceContainer::new().add_default::<Calculator>();
//!
//! let dispatcher = Dispatcher::new(Arc::new(context), Arc::new(registry));
//! let sum: i32 = dispatcher.query(Add(2, 3)).await.unwrap();
//! assert_eq!(sum, 5);
//! # });
//! ```

use crate::context::ConstructionContext;
use crate::error::{DispatchError, DispatchResult};
use crate::logging::log_dispatch_operation;
use crate::registry::{DispatchRegistry, Invoker};
use crate::signal::{HandlerOutput, Signal};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug_span, warn, Instrument};
use uuid::Uuid;

/// How the invokers of one fan-out group are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOutStrategy {
    /// Await each handler before starting the next.
    #[default]
    Sequential,
    /// Poll every handler together; results stay in registry order.
    Concurrent,
}

impl fmt::Display for FanOutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanOutStrategy::Sequential => write!(f, "sequential"),
            FanOutStrategy::Concurrent => write!(f, "concurrent"),
        }
    }
}

/// Routes signals to their registered handlers.
#[derive(Clone)]
pub struct Dispatcher {
    context: Arc<dyn ConstructionContext>,
    registry: Arc<DispatchRegistry>,
    strategy: FanOutStrategy,
}

impl Dispatcher {
    pub fn new(context: Arc<dyn ConstructionContext>, registry: Arc<DispatchRegistry>) -> Self {
        Self {
            context,
            registry,
            strategy: FanOutStrategy::default(),
        }
    }

    #[must_use]
    pub fn with_fan_out_strategy(mut self, strategy: FanOutStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn registry(&self) -> &Arc<DispatchRegistry> {
        &self.registry
    }

    pub fn fan_out_strategy(&self) -> FanOutStrategy {
        self.strategy
    }

    /// Send `signal` to every handler bound to its type.
    ///
    /// Results are positionally aligned with the registry's invoker order;
    /// no-result handlers contribute `None`. The first failure is returned and
    /// handlers that have not started yet are not run. `cancel` is handed to
    /// every handler; it is never used to skip one.
    pub async fn send<S: Signal>(
        &self,
        signal: S,
        cancel: CancellationToken,
    ) -> DispatchResult<Vec<Option<HandlerOutput>>> {
        let dispatch_id = Uuid::new_v4();
        let span = debug_span!(
            "dispatch",
            dispatch_id = %dispatch_id,
            signal = type_name::<S>(),
            strategy = %self.strategy
        );

        self.dispatch_all(signal, cancel, dispatch_id)
            .instrument(span)
            .await
    }

    /// Send `signal` to its single handler with a fresh cancellation token.
    pub async fn send_single<S: Signal>(&self, signal: S) -> DispatchResult<Option<HandlerOutput>> {
        self.send_single_with_cancellation(signal, CancellationToken::new())
            .await
    }

    /// Send `signal` to its single handler.
    ///
    /// Fails with [`DispatchError::AmbiguousDispatch`] when the signal type is
    /// bound to more than one handler.
    pub async fn send_single_with_cancellation<S: Signal>(
        &self,
        signal: S,
        cancel: CancellationToken,
    ) -> DispatchResult<Option<HandlerOutput>> {
        let dispatch_id = Uuid::new_v4();
        let span = debug_span!(
            "dispatch_single",
            dispatch_id = %dispatch_id,
            signal = type_name::<S>()
        );

        self.dispatch_one(signal, cancel, dispatch_id)
            .instrument(span)
            .await
    }

    /// Send `signal` to its single handler and downcast the value to `R`.
    pub async fn query<S: Signal, R: 'static>(&self, signal: S) -> DispatchResult<R> {
        let output = self
            .send_single(signal)
            .await?
            .ok_or(DispatchError::NoResult {
                signal: type_name::<S>(),
            })?;

        output
            .downcast::<R>()
            .map_err(|output| DispatchError::ResultTypeMismatch {
                signal: type_name::<S>(),
                expected: type_name::<R>(),
                actual: output.type_name(),
            })
    }

    async fn dispatch_all<S: Signal>(
        &self,
        signal: S,
        cancel: CancellationToken,
        dispatch_id: Uuid,
    ) -> DispatchResult<Vec<Option<HandlerOutput>>> {
        let invokers = self.lookup::<S>()?;
        let started = Instant::now();
        let outcome = match self.strategy {
            FanOutStrategy::Sequential => self.run_sequential(invokers, &signal, &cancel).await,
            FanOutStrategy::Concurrent => self.run_concurrent(invokers, &signal, &cancel).await,
        };
        record("send", dispatch_id, type_name::<S>(), invokers.len(), started, &outcome);
        outcome
    }

    async fn dispatch_one<S: Signal>(
        &self,
        signal: S,
        cancel: CancellationToken,
        dispatch_id: Uuid,
    ) -> DispatchResult<Option<HandlerOutput>> {
        let invoker = match self.lookup::<S>()? {
            [invoker] => invoker,
            invokers => {
                return Err(DispatchError::AmbiguousDispatch {
                    signal: type_name::<S>(),
                    handlers: invokers.iter().map(|i| i.handler().name()).collect(),
                })
            }
        };

        let started = Instant::now();
        let outcome = invoker.invoke(self.context.as_ref(), &signal, &cancel).await;
        record("send_single", dispatch_id, type_name::<S>(), 1, started, &outcome);
        outcome
    }

    fn lookup<S: Signal>(&self) -> DispatchResult<&[Invoker]> {
        self.registry
            .invokers_of::<S>()
            .ok_or(DispatchError::UnregisteredSignalType {
                signal: type_name::<S>(),
            })
    }

    async fn run_sequential(
        &self,
        invokers: &[Invoker],
        signal: &(dyn Any + Send + Sync),
        cancel: &CancellationToken,
    ) -> DispatchResult<Vec<Option<HandlerOutput>>> {
        let mut results = Vec::with_capacity(invokers.len());
        for invoker in invokers {
            results.push(invoker.invoke(self.context.as_ref(), signal, cancel).await?);
        }
        Ok(results)
    }

    async fn run_concurrent(
        &self,
        invokers: &[Invoker],
        signal: &(dyn Any + Send + Sync),
        cancel: &CancellationToken,
    ) -> DispatchResult<Vec<Option<HandlerOutput>>> {
        let context = self.context.as_ref();
        try_join_all(
            invokers
                .iter()
                .map(|invoker| invoker.invoke(context, signal, cancel)),
        )
        .await
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry.generation())
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

fn record<T>(
    operation: &str,
    dispatch_id: Uuid,
    signal: &'static str,
    handlers: usize,
    started: Instant,
    outcome: &DispatchResult<T>,
) {
    let elapsed = Some(u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX));
    match outcome {
        Ok(_) => log_dispatch_operation(
            operation,
            &dispatch_id.to_string(),
            signal,
            handlers,
            "completed",
            elapsed,
        ),
        Err(error) => {
            warn!(
                dispatch_id = %dispatch_id,
                signal = signal,
                error = %error,
                label = error.as_label(),
                "Dispatch failed"
            );
            log_dispatch_operation(
                operation,
                &dispatch_id.to_string(),
                signal,
                handlers,
                error.as_label(),
                elapsed,
            );
        }
    }
}
