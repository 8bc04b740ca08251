//! # Handler Capabilities
//!
//! Handlers come in two shapes:
//!
//! - [`SignalHandler<S>`] handles `S` and produces no value;
//! - [`ResultHandler<S>`] handles `S` and produces a typed [`Output`](ResultHandler::Output).
//!
//! Both extend [`Handler`], which carries the optional release hook. A handler
//! instance is built fresh for each invocation and [`Handler::release`] runs
//! exactly once when that invocation ends, whether the handler returned, failed,
//! panicked, or its future was dropped on cancellation.
//!
//! ```rust
//! use async_trait::async_trait;
//! use signal_dispatch::{Handler, HandlerResult, ResultHandler, Signal};
//! use tokio_util::sync::CancellationToken;
//!
//! struct GetUser {
//!     id: u64,
//! }
//! impl Signal for GetUser {}
//!
//! struct UserLookup;
//! impl Handler for UserLookup {}
//!
//! #[async_trait]
//! impl ResultHandler<GetUser> for UserLookup {
//!     type Output = String;
//!
//!     async fn handle(&self, signal: &GetUser, _cancel: CancellationToken) -> HandlerResult<String> {
//!         Ok(format!("user-{}", signal.id))
//!     }
//! }
//! ```

use crate::signal::Signal;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Result type returned by handler logic.
pub type HandlerResult<T> = anyhow::Result<T>;

/// Base capability shared by every handler type.
pub trait Handler: Send + Sync + 'static {
    /// Release resources held by this instance.
    ///
    /// Called once per constructed instance after handling ends on any path.
    fn release(&mut self) {}
}

/// Fire-and-forget handler for signal `S`.
#[async_trait]
pub trait SignalHandler<S: Signal>: Handler {
    /// Handle the signal.
    ///
    /// The token is the caller's cooperative cancellation signal; long running
    /// handlers should check it and return early.
    async fn handle(&self, signal: &S, cancel: CancellationToken) -> HandlerResult<()>;
}

/// Value-returning handler for signal `S`.
#[async_trait]
pub trait ResultHandler<S: Signal>: Handler {
    type Output: Send + 'static;

    async fn handle(&self, signal: &S, cancel: CancellationToken) -> HandlerResult<Self::Output>;
}
