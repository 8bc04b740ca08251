//! # Invoker Compiler
//!
//! Turns bindings into [`Invoker`]s, the precompiled call paths stored in the
//! registry.
//!
//! ## Compilation Model
//!
//! The per-binding work is done by the type system. Registering a capability
//! through [`HandlerType`](super::HandlerType) instantiates
//! [`invoke_no_result`] or [`invoke_with_result`] for the concrete
//! `(handler, signal)` pair and stores the resulting function pointer. The
//! compiler wraps that pointer with its metadata and optional tracing, so a
//! dispatch is a map lookup followed by direct calls:
//!
//! ```text
//! Invoker::invoke(ctx, signal, cancel)
//!   ├─► downcast signal to S               (SignalTypeMismatch)
//!   ├─► ctx.resolve::<H>()                 (HandlerConstructionFailure)
//!   ├─► ReleaseGuard::new(handler)
//!   ├─► handler.handle(&signal, cancel)    (HandlerExecutionFailure)
//!   ├─► normalize to Option<HandlerOutput>
//!   └─► guard dropped ─► Handler::release()  (every exit path)
//! ```

use super::binder::{Binding, BindingGroup, BindingPolicy};
use crate::context::{ConstructionContext, ContextExt};
use crate::error::{BuildError, BuildResult, DispatchError, DispatchResult};
use crate::handler::{Handler, ResultHandler, SignalHandler};
use crate::signal::{HandlerOutput, Signal, TypeKey};
use futures::future::BoxFuture;
use std::any::{type_name, Any};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, Instrument};

/// Outcome of one handler invocation.
pub type InvocationResult = DispatchResult<Option<HandlerOutput>>;

/// Monomorphized entry point of an invoker.
pub type InvokeFn = for<'a> fn(
    &'a dyn ConstructionContext,
    &'a (dyn Any + Send + Sync),
    &'a CancellationToken,
) -> BoxFuture<'a, InvocationResult>;

/// Calls [`Handler::release`] when dropped.
///
/// Holding the handler inside the guard ties release to scope exit, which
/// covers normal return, `?` propagation, panics, and the owning future being
/// dropped mid-await.
struct ReleaseGuard<H: Handler> {
    handler: H,
}

impl<H: Handler> ReleaseGuard<H> {
    fn new(handler: H) -> Self {
        Self { handler }
    }

    fn handler(&self) -> &H {
        &self.handler
    }
}

impl<H: Handler> Drop for ReleaseGuard<H> {
    fn drop(&mut self) {
        self.handler.release();
    }
}

fn downcast_signal<S: Signal>(signal: &(dyn Any + Send + Sync)) -> DispatchResult<&S> {
    signal
        .downcast_ref::<S>()
        .ok_or(DispatchError::SignalTypeMismatch {
            expected: type_name::<S>(),
            actual: "<other>",
        })
}

fn construct<H: Handler, S: Signal>(
    ctx: &dyn ConstructionContext,
) -> DispatchResult<ReleaseGuard<H>> {
    ctx.resolve::<H>()
        .map(ReleaseGuard::new)
        .map_err(|source| DispatchError::HandlerConstructionFailure {
            handler: type_name::<H>(),
            signal: type_name::<S>(),
            source,
        })
}

fn execution_failure<H, S>(source: anyhow::Error) -> DispatchError {
    DispatchError::HandlerExecutionFailure {
        handler: type_name::<H>(),
        signal: type_name::<S>(),
        source,
    }
}

async fn run_no_result<H, S>(
    ctx: &dyn ConstructionContext,
    signal: &(dyn Any + Send + Sync),
    cancel: &CancellationToken,
) -> InvocationResult
where
    H: SignalHandler<S>,
    S: Signal,
{
    let signal = downcast_signal::<S>(signal)?;
    let guard = construct::<H, S>(ctx)?;
    <H as SignalHandler<S>>::handle(guard.handler(), signal, cancel.clone())
        .await
        .map_err(execution_failure::<H, S>)?;
    Ok(None)
}

async fn run_with_result<H, S>(
    ctx: &dyn ConstructionContext,
    signal: &(dyn Any + Send + Sync),
    cancel: &CancellationToken,
) -> InvocationResult
where
    H: ResultHandler<S>,
    S: Signal,
{
    let signal = downcast_signal::<S>(signal)?;
    let guard = construct::<H, S>(ctx)?;
    let output = <H as ResultHandler<S>>::handle(guard.handler(), signal, cancel.clone())
        .await
        .map_err(execution_failure::<H, S>)?;
    Ok(Some(HandlerOutput::new(output)))
}

/// Entry point for a [`SignalHandler`] binding; always yields `None`.
pub fn invoke_no_result<'a, H, S>(
    ctx: &'a dyn ConstructionContext,
    signal: &'a (dyn Any + Send + Sync),
    cancel: &'a CancellationToken,
) -> BoxFuture<'a, InvocationResult>
where
    H: SignalHandler<S>,
    S: Signal,
{
    Box::pin(run_no_result::<H, S>(ctx, signal, cancel))
}

/// Entry point for a [`ResultHandler`] binding; yields the handler's output.
pub fn invoke_with_result<'a, H, S>(
    ctx: &'a dyn ConstructionContext,
    signal: &'a (dyn Any + Send + Sync),
    cancel: &'a CancellationToken,
) -> BoxFuture<'a, InvocationResult>
where
    H: ResultHandler<S>,
    S: Signal,
{
    Box::pin(run_with_result::<H, S>(ctx, signal, cancel))
}

/// Precompiled invocation thunk for one `(handler, signal, result)` triple.
#[derive(Clone)]
pub struct Invoker {
    handler: TypeKey,
    signal: TypeKey,
    result: Option<TypeKey>,
    entry: InvokeFn,
    instrumented: bool,
}

impl Invoker {
    pub fn handler(&self) -> TypeKey {
        self.handler
    }

    pub fn signal(&self) -> TypeKey {
        self.signal
    }

    /// Result type, or `None` for a no-result handler.
    pub fn result(&self) -> Option<TypeKey> {
        self.result
    }

    /// Construct the handler, run it against `signal`, and release it.
    pub fn invoke<'a>(
        &'a self,
        ctx: &'a dyn ConstructionContext,
        signal: &'a (dyn Any + Send + Sync),
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, InvocationResult> {
        let call = (self.entry)(ctx, signal, cancel);
        if !self.instrumented {
            return call;
        }

        let span = debug_span!(
            "invoke_handler",
            handler = self.handler.name(),
            signal = self.signal.name()
        );
        Box::pin(call.instrument(span))
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invoker")
            .field("handler", &self.handler)
            .field("signal", &self.signal)
            .field("result", &self.result)
            .field("instrumented", &self.instrumented)
            .finish()
    }
}

/// Compiles bindings into invokers and enforces the binding policy per group.
#[derive(Debug, Clone, Copy)]
pub struct InvokerCompiler {
    policy: BindingPolicy,
    instrument: bool,
}

impl InvokerCompiler {
    pub fn new(policy: BindingPolicy) -> Self {
        Self {
            policy,
            instrument: false,
        }
    }

    /// Attach a tracing span to every invocation.
    #[must_use]
    pub fn with_instrumentation(mut self, instrument: bool) -> Self {
        self.instrument = instrument;
        self
    }

    pub fn compile(&self, binding: &Binding) -> Invoker {
        Invoker {
            handler: binding.handler(),
            signal: binding.signal(),
            result: binding.result(),
            entry: binding.entry(),
            instrumented: self.instrument,
        }
    }

    /// Compile every binding of a group, preserving binding order.
    ///
    /// Fails with [`BuildError::DuplicateHandlerBinding`] when the policy is
    /// [`BindingPolicy::Single`] and the group holds more than one binding.
    pub fn compile_group(&self, group: &BindingGroup) -> BuildResult<Box<[Invoker]>> {
        if self.policy == BindingPolicy::Single && group.len() > 1 {
            return Err(BuildError::DuplicateHandlerBinding {
                signal: group.signal().name(),
                handlers: group.bindings().iter().map(|b| b.handler().name()).collect(),
            });
        }

        let invokers: Box<[Invoker]> = group.bindings().iter().map(|b| self.compile(b)).collect();
        debug!(
            signal = group.signal().name(),
            invokers = invokers.len(),
            "Compiled invoker group"
        );
        Ok(invokers)
    }
}
