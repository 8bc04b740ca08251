//! Signals, handlers and a shared recorder used across the integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use signal_dispatch::{
    CancellationToken, ConstructionContext, ContextExt, Handler, HandlerResult, ResultHandler,
    ServiceContainer, Signal, SignalHandler,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Records what handlers did during a dispatch.
#[derive(Debug, Default)]
pub struct Recorder {
    constructed: AtomicUsize,
    released: AtomicUsize,
    saw_cancellation: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, label: impl Into<String>, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            self.saw_cancellation.fetch_add(1, Ordering::SeqCst);
        }
        self.calls.lock().push(label.into());
    }

    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn saw_cancellation(&self) -> usize {
        self.saw_cancellation.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handler built from the recorder registered in the container.
pub trait Recorded: Send + 'static {
    fn with_recorder(recorder: Arc<Recorder>) -> Self;
}

/// Register `H` as a transient that counts its constructions.
pub fn recorded<H: Recorded>(container: ServiceContainer) -> ServiceContainer {
    container.add_transient(|ctx: &dyn ConstructionContext| {
        let recorder = ctx.resolve::<Arc<Recorder>>()?;
        recorder.constructed.fetch_add(1, Ordering::SeqCst);
        Ok(H::with_recorder(recorder))
    })
}

// Signals

pub struct Ping;
impl Signal for Ping {}

pub struct GetUser {
    pub id: u64,
}
impl Signal for GetUser {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDto {
    pub id: u64,
    pub name: String,
}

pub struct Notify;
impl Signal for Notify {}

pub struct Unregistered;
impl Signal for Unregistered {}

macro_rules! recorded_handler {
    ($name:ident) => {
        pub struct $name {
            recorder: Arc<Recorder>,
        }

        impl Recorded for $name {
            fn with_recorder(recorder: Arc<Recorder>) -> Self {
                Self { recorder }
            }
        }

        impl Handler for $name {
            fn release(&mut self) {
                self.recorder.release();
            }
        }
    };
}

macro_rules! labelled_notify_handler {
    ($name:ident, $label:literal) => {
        recorded_handler!($name);

        #[async_trait]
        impl ResultHandler<Notify> for $name {
            type Output = &'static str;

            async fn handle(
                &self,
                _signal: &Notify,
                cancel: CancellationToken,
            ) -> HandlerResult<&'static str> {
                self.recorder.record($label, &cancel);
                Ok($label)
            }
        }
    };
}

recorded_handler!(PingHandler);

#[async_trait]
impl SignalHandler<Ping> for PingHandler {
    async fn handle(&self, _signal: &Ping, cancel: CancellationToken) -> HandlerResult<()> {
        self.recorder.record("ping", &cancel);
        Ok(())
    }
}

recorded_handler!(UserQueryHandler);

#[async_trait]
impl ResultHandler<GetUser> for UserQueryHandler {
    type Output = UserDto;

    async fn handle(&self, signal: &GetUser, cancel: CancellationToken) -> HandlerResult<UserDto> {
        self.recorder.record(format!("get_user:{}", signal.id), &cancel);
        match signal.id {
            7 => Ok(UserDto {
                id: 7,
                name: "Ann".to_string(),
            }),
            id => anyhow::bail!("user {id} not found"),
        }
    }
}

recorded_handler!(ShadowUserHandler);

#[async_trait]
impl ResultHandler<GetUser> for ShadowUserHandler {
    type Output = UserDto;

    async fn handle(&self, signal: &GetUser, _cancel: CancellationToken) -> HandlerResult<UserDto> {
        Ok(UserDto {
            id: signal.id,
            name: "shadow".to_string(),
        })
    }
}

labelled_notify_handler!(NotifyA, "A");
labelled_notify_handler!(NotifyB, "B");
labelled_notify_handler!(NotifyC, "C");

recorded_handler!(FailingNotify);

#[async_trait]
impl SignalHandler<Notify> for FailingNotify {
    async fn handle(&self, _signal: &Notify, cancel: CancellationToken) -> HandlerResult<()> {
        self.recorder.record("fail", &cancel);
        anyhow::bail!("notification channel closed")
    }
}

recorded_handler!(CancellingNotify);

#[async_trait]
impl SignalHandler<Notify> for CancellingNotify {
    async fn handle(&self, _signal: &Notify, cancel: CancellationToken) -> HandlerResult<()> {
        self.recorder.record("cancel", &cancel);
        cancel.cancel();
        Ok(())
    }
}

recorded_handler!(AwaitCancellationNotify);

#[async_trait]
impl SignalHandler<Notify> for AwaitCancellationNotify {
    async fn handle(&self, _signal: &Notify, cancel: CancellationToken) -> HandlerResult<()> {
        cancel.cancelled().await;
        self.recorder.record("cancelled", &cancel);
        Ok(())
    }
}

recorded_handler!(StuckNotify);

#[async_trait]
impl SignalHandler<Notify> for StuckNotify {
    async fn handle(&self, _signal: &Notify, cancel: CancellationToken) -> HandlerResult<()> {
        self.recorder.record("stuck", &cancel);
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Sleeps `MS` milliseconds, then answers with `MS`.
pub struct Delayed<const MS: u64> {
    recorder: Arc<Recorder>,
}

impl<const MS: u64> Recorded for Delayed<MS> {
    fn with_recorder(recorder: Arc<Recorder>) -> Self {
        Self { recorder }
    }
}

impl<const MS: u64> Handler for Delayed<MS> {
    fn release(&mut self) {
        self.recorder.release();
    }
}

#[async_trait]
impl<const MS: u64> ResultHandler<Notify> for Delayed<MS> {
    type Output = u64;

    async fn handle(&self, _signal: &Notify, cancel: CancellationToken) -> HandlerResult<u64> {
        tokio::time::sleep(Duration::from_millis(MS)).await;
        self.recorder.record(format!("delayed:{MS}"), &cancel);
        Ok(MS)
    }
}

/// Answers `Notify` with `N`.
pub struct Numbered<const N: usize> {
    recorder: Arc<Recorder>,
}

impl<const N: usize> Recorded for Numbered<N> {
    fn with_recorder(recorder: Arc<Recorder>) -> Self {
        Self { recorder }
    }
}

impl<const N: usize> Handler for Numbered<N> {
    fn release(&mut self) {
        self.recorder.release();
    }
}

#[async_trait]
impl<const N: usize> ResultHandler<Notify> for Numbered<N> {
    type Output = usize;

    async fn handle(&self, _signal: &Notify, cancel: CancellationToken) -> HandlerResult<usize> {
        self.recorder.record(N.to_string(), &cancel);
        Ok(N)
    }
}

/// Container with every fixture handler registered against `recorder`.
pub fn container(recorder: &Arc<Recorder>) -> ServiceContainer {
    let container = ServiceContainer::new().add_instance(Arc::clone(recorder));
    let container = recorded::<PingHandler>(container);
    let container = recorded::<UserQueryHandler>(container);
    let container = recorded::<ShadowUserHandler>(container);
    let container = recorded::<NotifyA>(container);
    let container = recorded::<NotifyB>(container);
    let container = recorded::<NotifyC>(container);
    let container = recorded::<FailingNotify>(container);
    let container = recorded::<CancellingNotify>(container);
    let container = recorded::<AwaitCancellationNotify>(container);
    let container = recorded::<StuckNotify>(container);
    let container = recorded::<Delayed<5>>(container);
    let container = recorded::<Delayed<30>>(container);
    let container = recorded::<Delayed<60>>(container);
    let container = recorded::<Numbered<0>>(container);
    let container = recorded::<Numbered<1>>(container);
    let container = recorded::<Numbered<2>>(container);
    let container = recorded::<Numbered<3>>(container);
    let container = recorded::<Numbered<4>>(container);
    let container = recorded::<Numbered<5>>(container);
    let container = recorded::<Numbered<6>>(container);
    recorded::<Numbered<7>>(container)
}
