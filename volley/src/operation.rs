//! Seams to the system under test.
//!
//! The engine never builds transports itself. It drives a [`RequestOp`], and for connection
//! churn shapes asks a [`Connector`] for a fresh one per phase.
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Run-scoped context handed to every request.
#[derive(Clone, Debug)]
pub struct RunContext {
    scenario: Arc<str>,
    cancel: CancellationToken,
}

impl RunContext {
    /// Build a context outside of a run, e.g. to exercise an op directly.
    pub fn new(scenario: &str, cancel: CancellationToken) -> Self {
        Self {
            scenario: scenario.into(),
            cancel,
        }
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the run is stopping. Long operations may race against this.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// One request against the endpoint. Resolves to the payload size on success.
///
/// Implemented for any `Fn(RunContext, u64) -> impl Future<Output = Result<usize, E>>`:
///
/// ```
/// use volley::prelude::*;
///
/// let op = |_cx: RunContext, id: u64| async move {
///     if id % 2 == 0 { Ok(512_usize) } else { Err("odd request") }
/// };
/// let _scenario = Scenario::from_op("echo", op);
/// ```
pub trait RequestOp: Send + Sync + 'static {
    type Error: Display + Send;

    fn call(
        &self,
        cx: &RunContext,
        id: u64,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;
}

impl<T, F, E> RequestOp for T
where
    T: Fn(RunContext, u64) -> F + Send + Sync + 'static,
    F: Future<Output = Result<usize, E>> + Send,
    E: Display + Send,
{
    type Error = E;

    fn call(&self, cx: &RunContext, id: u64) -> impl Future<Output = Result<usize, E>> + Send {
        (self)(cx.clone(), id)
    }
}

/// Builds and tears down the resource a [`RequestOp`] runs on.
///
/// Implemented for any `Fn() -> impl Future<Output = Result<Op, E>>`.
pub trait Connector: Send + Sync + 'static {
    type Op: RequestOp;
    type Error: Display + Send;

    fn connect(&self) -> impl Future<Output = Result<Self::Op, Self::Error>> + Send;

    fn release(&self, op: Self::Op) -> impl Future<Output = ()> + Send {
        async move { drop(op) }
    }
}

impl<T, F, O, E> Connector for T
where
    T: Fn() -> F + Send + Sync + 'static,
    F: Future<Output = Result<O, E>> + Send,
    O: RequestOp,
    E: Display + Send,
{
    type Op = O;
    type Error = E;

    fn connect(&self) -> impl Future<Output = Result<O, E>> + Send {
        (self)()
    }
}

/// Connector handing out one shared operation instance. Built by [`Scenario::from_op`].
///
/// [`Scenario::from_op`]: crate::Scenario::from_op
pub struct Shared<O>(Arc<O>);

impl<O: RequestOp> Shared<O> {
    pub fn new(op: O) -> Self {
        Self(Arc::new(op))
    }
}

/// The operation handed out by [`Shared`].
pub struct SharedOp<O>(Arc<O>);

impl<O: RequestOp> RequestOp for SharedOp<O> {
    type Error = O::Error;

    fn call(
        &self,
        cx: &RunContext,
        id: u64,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send {
        self.0.call(cx, id)
    }
}

impl<O: RequestOp> Connector for Shared<O> {
    type Op = SharedOp<O>;
    type Error = Infallible;

    fn connect(&self) -> impl Future<Output = Result<Self::Op, Self::Error>> + Send {
        let op = self.0.clone();
        async move { Ok(SharedOp(op)) }
    }
}
