//! Scenario builder and run orchestration
use crate::collector::Collector;
use crate::counters::Counters;
use crate::dispatcher::Dispatcher;
use crate::error::RunError;
use crate::operation::{Connector, RequestOp, RunContext, Shared};
use crate::progress;
use crate::recorder::Recorder;
use crate::worker;
use std::{
    future::Future,
    num::NonZeroU32,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};
use volley_core::{
    BurstCycle, ConfigError, ConstantRate, Dispatch, ParallelStreams, Periodic, PhaseCycle,
    RampSchedule, RunReport, ScenarioConfig, SmoothRamp, Summary, WorkerMode,
};

type RunFuture = Pin<Box<dyn Future<Output = Result<RunReport, RunError>> + Send>>;

/// Load test scenario
///
/// Configure it through [`ConfigurableScenario`], then `.await` it to run. Nothing starts until
/// the first poll.
#[pin_project::pin_project]
pub struct Scenario<C> {
    connector: Option<C>,
    runner_fut: Option<RunFuture>,
    config: ScenarioConfig,
    budget: Option<u64>,
    deferred: Option<ConfigError>,
    stop: Option<CancellationToken>,
}

impl<C: Connector> Scenario<C> {
    /// A scenario whose requests run on connections produced by `connector`.
    ///
    /// Phase-cycling workers connect and release per phase; every other mode connects once up
    /// front and shares that connection between all workers.
    pub fn new(name: &str, connector: C) -> Self {
        Self {
            connector: Some(connector),
            runner_fut: None,
            config: ScenarioConfig::new(name),
            budget: None,
            deferred: None,
            stop: None,
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Replace the workload. Drops any parse error left by an earlier workload.
    fn set_mode(mut self, mode: WorkerMode) -> Self {
        self.deferred = None;
        self.config.mode = Some(mode);
        self
    }
}

impl<O: RequestOp> Scenario<Shared<O>> {
    /// A scenario where every request goes through one shared `op`.
    pub fn from_op(name: &str, op: O) -> Self {
        Self::new(name, Shared::new(op))
    }
}

impl<C: Connector> Future for Scenario<C> {
    type Output = Result<RunReport, RunError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if this.runner_fut.is_none() {
            let connector = this.connector.take();
            let config = this.config.clone();
            let budget = *this.budget;
            let deferred = this.deferred.take();
            let stop = this.stop.clone();

            *this.runner_fut = Some(Box::pin(async move {
                if let Some(err) = deferred {
                    return Err(err.into());
                }
                let Some(connector) = connector else {
                    unreachable!("scenario polled after completion");
                };
                let config = apply_budget(config, budget);
                let cancel = stop.map_or_else(CancellationToken::new, |stop| stop.child_token());
                run_scenario(connector, config, cancel).await
            }));
        }

        match this.runner_fut {
            Some(runner) => runner.as_mut().poll(cx),
            None => unreachable!(),
        }
    }
}

pub trait ConfigurableScenario<T: Send>: Future<Output = T> + Sized + Send {
    fn workers(self, workers: usize) -> Self;
    fn duration(self, duration: Duration) -> Self;
    fn constant_rate(self, rate: NonZeroU32) -> Self;
    fn token_budget(self, max_tokens: u64) -> Self;
    fn burst(self, burst: BurstCycle) -> Self;
    fn ramp(self, schedule: RampSchedule) -> Self;
    fn ramp_str(self, schedule: &str) -> Self;
    fn smooth_ramp(self, profile: SmoothRamp) -> Self;
    fn periodic(self, period: Duration, jitter: Duration) -> Self;
    fn phase_cycling(self, cycle: PhaseCycle) -> Self;
    fn parallel_streams(self, parallel: ParallelStreams) -> Self;
    fn token_capacity(self, capacity: usize) -> Self;
    fn record_capacity(self, capacity: usize) -> Self;
    fn progress(self, enabled: bool) -> Self;
    fn cancel_on(self, token: CancellationToken) -> Self;
}

impl<C: Connector> ConfigurableScenario<Result<RunReport, RunError>> for Scenario<C> {
    /// Number of concurrent workers. Defaults to 1.
    fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Stop the run after `duration`, even if its traffic shape has not finished.
    ///
    /// NOTE: Required for constant-rate dispatch without a token budget and for periodic
    /// workers.
    fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = Some(duration);
        self
    }

    /// Dispatch tokens at a fixed rate.
    ///
    /// # Example
    /// ```no_run
    /// use volley::prelude::*;
    /// use std::num::NonZeroU32;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let op = |_cx: RunContext, _id: u64| async { Ok::<usize, String>(512) };
    ///     let report = Scenario::from_op("steady", op)
    ///         .workers(64)
    ///         .constant_rate(NonZeroU32::new(2_000).unwrap())
    ///         .duration(Duration::from_secs(120))
    ///         .await
    ///         .unwrap();
    ///     println!("{}", report.summary);
    /// }
    /// ```
    fn constant_rate(self, rate: NonZeroU32) -> Self {
        self.set_mode(WorkerMode::Token(Dispatch::Constant(ConstantRate {
            rate,
            max_tokens: None,
        })))
    }

    /// Finish a constant-rate dispatch once `max_tokens` tokens have been enqueued.
    fn token_budget(mut self, max_tokens: u64) -> Self {
        self.budget = Some(max_tokens);
        self
    }

    /// Alternate idle and burst periods.
    fn burst(self, burst: BurstCycle) -> Self {
        self.set_mode(WorkerMode::Token(Dispatch::Burst(burst)))
    }

    /// Step through a multi-stage schedule.
    fn ramp(self, schedule: RampSchedule) -> Self {
        self.set_mode(WorkerMode::Token(Dispatch::Ramp(schedule)))
    }

    /// Parse a schedule such as `"30@1000,30@2000"`. A malformed schedule fails the run when it
    /// is awaited, before anything starts.
    ///
    /// # Example
    /// ```no_run
    /// use volley::prelude::*;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let op = |_cx: RunContext, _id: u64| async { Ok::<usize, String>(512) };
    ///     let report = Scenario::from_op("ramp", op)
    ///         .workers(256)
    ///         .ramp_str("30@1000,30@2000,30@4000")
    ///         .await;
    /// }
    /// ```
    fn ramp_str(mut self, schedule: &str) -> Self {
        match schedule.parse() {
            Ok(schedule) => self.ramp(schedule),
            Err(err) => {
                self.deferred = Some(err);
                self
            }
        }
    }

    /// Ramp linearly to a peak, hold it, and ramp back down.
    fn smooth_ramp(self, profile: SmoothRamp) -> Self {
        self.set_mode(WorkerMode::Token(Dispatch::Smooth(profile)))
    }

    /// Each worker paces itself: one request every `period` plus up to `jitter`.
    fn periodic(self, period: Duration, jitter: Duration) -> Self {
        self.set_mode(WorkerMode::Periodic(Periodic { period, jitter }))
    }

    /// Each worker cycles through fresh connections.
    fn phase_cycling(self, cycle: PhaseCycle) -> Self {
        self.set_mode(WorkerMode::PhaseCycling(cycle))
    }

    /// Each worker issues batches of concurrent requests.
    fn parallel_streams(self, parallel: ParallelStreams) -> Self {
        self.set_mode(WorkerMode::ParallelStreams(parallel))
    }

    fn token_capacity(mut self, capacity: usize) -> Self {
        self.config.token_capacity = capacity;
        self
    }

    fn record_capacity(mut self, capacity: usize) -> Self {
        self.config.record_capacity = capacity;
        self
    }

    /// Log running totals once a second. Enabled by default.
    fn progress(mut self, enabled: bool) -> Self {
        self.config.progress = enabled;
        self
    }

    /// Stop the run when `token` is cancelled.
    fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.stop = Some(token);
        self
    }
}

fn apply_budget(mut config: ScenarioConfig, budget: Option<u64>) -> ScenarioConfig {
    if let Some(budget) = budget {
        match &mut config.mode {
            Some(WorkerMode::Token(Dispatch::Constant(constant))) => {
                constant.max_tokens = Some(budget);
            }
            _ => warn!("Token budget only applies to constant-rate dispatch; ignoring it"),
        }
    }
    config
}

#[instrument(name = "scenario", skip_all, fields(name = config.name))]
pub(crate) async fn run_scenario<C: Connector>(
    connector: C,
    config: ScenarioConfig,
    cancel: CancellationToken,
) -> Result<RunReport, RunError> {
    config.validate()?;
    let mode = config.mode.clone().ok_or(ConfigError::NoWorkload)?;
    info!("Running {} with config {:?}", config.name, &config);

    #[cfg(feature = "metrics")]
    metrics::describe_histogram!(
        crate::recorder::LATENCY_METRIC,
        metrics::Unit::Nanoseconds,
        "Request latency"
    );

    let start = Instant::now();
    let connector = Arc::new(connector);

    let shared = match mode {
        WorkerMode::PhaseCycling(_) => None,
        _ => match connector.connect().await {
            Ok(op) => Some(Arc::new(op)),
            Err(err) => {
                warn!("Failed to connect: {err}");
                return Err(RunError::Connect(err.to_string()));
            }
        },
    };

    let counters = Counters::new();
    let (record_tx, record_rx) = mpsc::channel(config.record_capacity);
    let collector = Collector::spawn(record_rx);
    let recorder = Recorder::new(
        RunContext::new(&config.name, cancel.clone()),
        counters.clone(),
        record_tx,
    );

    let mut helpers = JoinSet::new();
    if config.progress {
        helpers.spawn(
            progress::report(counters.clone(), collector.log(), cancel.clone()).in_current_span(),
        );
    }
    if let Some(duration) = config.duration {
        helpers.spawn(stop_after(duration, cancel.clone()).in_current_span());
    }

    let mut workers = JoinSet::new();
    let mut dispatcher = None;
    match (mode, &shared) {
        (WorkerMode::Token(policy), Some(op)) => {
            let (tx, rx) = async_channel::bounded(config.token_capacity);
            for i in 0..config.workers {
                workers.spawn(
                    worker::token::run(i, recorder.clone(), op.clone(), rx.clone())
                        .in_current_span(),
                );
            }
            let run = Dispatcher::new(tx, cancel.clone()).run(policy);
            dispatcher = Some(tokio::spawn(run.in_current_span()));
        }
        (WorkerMode::Periodic(periodic), Some(op)) => {
            for i in 0..config.workers {
                workers.spawn(
                    worker::periodic::run(i, recorder.clone(), op.clone(), periodic)
                        .in_current_span(),
                );
            }
        }
        (WorkerMode::ParallelStreams(parallel), Some(op)) => {
            for i in 0..config.workers {
                workers.spawn(
                    worker::parallel::run(i, recorder.clone(), op.clone(), parallel)
                        .in_current_span(),
                );
            }
        }
        (WorkerMode::PhaseCycling(cycle), _) => {
            for i in 0..config.workers {
                workers.spawn(
                    worker::phase::run(i, recorder.clone(), connector.clone(), cycle)
                        .in_current_span(),
                );
            }
        }
        (_, None) => unreachable!("shared connection is established for every non-phase mode"),
    }
    // Workers hold the only remaining senders now.
    drop(recorder);
    info!("Started {} workers", config.workers);

    let dispatch = match dispatcher {
        Some(handle) => Some(handle.await?),
        None => None,
    };
    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            error!("Worker failed: {err}");
        }
    }

    let interrupted = cancel.is_cancelled();
    cancel.cancel();
    while helpers.join_next().await.is_some() {}

    if let Some(op) = shared {
        match Arc::try_unwrap(op) {
            Ok(op) => connector.release(op).await,
            Err(_) => warn!("Shared connection still referenced after workers exited"),
        }
    }

    let records = collector.finish().await?;
    let summary = Summary::from_records(&records);
    let elapsed = start.elapsed();
    info!(
        "Scenario complete in {}: {summary}",
        humantime::format_duration(elapsed)
    );

    Ok(RunReport {
        name: config.name,
        records,
        summary,
        totals: counters.totals(),
        dispatch,
        elapsed,
        interrupted,
    })
}

async fn stop_after(duration: Duration, cancel: CancellationToken) {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(duration) => {
            info!("Duration of {} elapsed; stopping", humantime::format_duration(duration));
            cancel.cancel();
        }
    }
}
