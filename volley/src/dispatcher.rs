//! Token emission policies.
//!
//! A dispatcher offers [`DispatchToken`]s to a bounded queue without ever waiting on it: a full
//! queue drops the token. Every wait races the run's cancellation token. When a policy runs out
//! of schedule the dispatcher is dropped, which closes the queue so token workers drain it and
//! exit.
mod burst;
mod constant;
mod ramp;
mod smooth;

use crate::pacer::Pacer;
use async_channel::{Sender, TrySendError};
use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::{Dispatch, DispatchStats, DispatchToken};

pub(crate) struct Dispatcher {
    tokens: Sender<DispatchToken>,
    cancel: CancellationToken,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(tokens: Sender<DispatchToken>, cancel: CancellationToken) -> Self {
        Self {
            tokens,
            cancel,
            stats: DispatchStats::default(),
        }
    }

    pub async fn run(mut self, policy: Dispatch) -> DispatchStats {
        info!("Dispatching {policy}");

        let flow = match policy {
            Dispatch::Constant(config) => constant::run(&mut self, config).await,
            Dispatch::Burst(config) => burst::run(&mut self, config).await,
            Dispatch::Ramp(schedule) => ramp::run(&mut self, &schedule).await,
            Dispatch::Smooth(profile) => smooth::run(&mut self, profile).await,
        };

        match flow {
            ControlFlow::Continue(()) => info!("Dispatch schedule complete: {}", self.stats),
            ControlFlow::Break(()) => info!("Dispatch stopped: {}", self.stats),
        }
        self.stats
    }

    /// Try to enqueue one token. Never waits.
    fn offer(&mut self) -> bool {
        self.stats.offered += 1;
        match self.tokens.try_send(DispatchToken) {
            Ok(()) => {
                self.stats.enqueued += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                self.stats.dropped += 1;
                false
            }
            Err(TrySendError::Closed(_)) => {
                trace!("Token queue closed");
                self.stats.dropped += 1;
                false
            }
        }
    }

    /// Emit at `rate` until `deadline` (or forever) or until `budget` tokens have been enqueued
    /// in total.
    ///
    /// Breaks on cancellation; continues once the deadline passes or the budget is spent.
    async fn emit(
        &mut self,
        rate: NonZeroU32,
        deadline: Option<Instant>,
        budget: Option<u64>,
    ) -> ControlFlow<()> {
        let cancel = self.cancel.clone();
        let mut pacer = Pacer::rate(rate);
        debug!("Emitting every {pacer}");

        let until = async {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(until);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return ControlFlow::Break(()),
                at = pacer.tick() => {
                    if deadline.is_some_and(|deadline| at > deadline) {
                        return ControlFlow::Continue(());
                    }
                    self.offer();
                    if budget.is_some_and(|max| self.stats.enqueued >= max) {
                        info!("Token budget of {} reached", self.stats.enqueued);
                        return ControlFlow::Continue(());
                    }
                }
                _ = &mut until => return ControlFlow::Continue(()),
            }
        }
    }

    /// Emit nothing until `deadline`.
    async fn idle(&self, deadline: Instant) -> ControlFlow<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => ControlFlow::Break(()),
            _ = sleep_until(deadline) => ControlFlow::Continue(()),
        }
    }
}

/// Move a stage deadline forward by `by`. Breaks if the clock cannot represent it.
fn extend(deadline: Instant, by: Duration) -> ControlFlow<(), Instant> {
    match deadline.checked_add(by) {
        Some(next) => ControlFlow::Continue(next),
        None => {
            error!("Stage of {} overflows the clock", humantime::format_duration(by));
            ControlFlow::Break(())
        }
    }
}
