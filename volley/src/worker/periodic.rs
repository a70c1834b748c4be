use super::pause;
use crate::operation::RequestOp;
use crate::recorder::Recorder;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::Periodic;

/// Self-paced worker: one request, then `period` plus up to `jitter` of random delay.
pub(crate) async fn run<O: RequestOp>(
    worker: usize,
    recorder: Recorder,
    op: Arc<O>,
    config: Periodic,
) {
    debug!("Periodic worker {worker} started");
    let cancel = recorder.context().token().clone();
    let mut rng = SmallRng::from_entropy();
    let mut performed = 0u64;

    while !cancel.is_cancelled() {
        recorder.perform(&*op).await;
        performed += 1;

        if !pause(&cancel, config.period + jitter(&mut rng, config.jitter)).await {
            break;
        }
    }

    debug!("Periodic worker {worker} finished after {performed} requests");
}

/// Uniform in `[0, max)`.
fn jitter(rng: &mut SmallRng, max: Duration) -> Duration {
    let nanos = max.as_nanos().min(u64::MAX as u128) as u64;
    if nanos == 0 {
        Duration::ZERO
    } else {
        Duration::from_nanos(rng.gen_range(0..nanos))
    }
}
