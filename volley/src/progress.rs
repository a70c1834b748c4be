use crate::collector::RecordLog;
use crate::counters::Counters;
use crate::pacer::Pacer;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::PROGRESS_INTERVAL;

/// Logs running totals and per-interval deltas until cancelled.
pub(crate) async fn report(counters: Counters, log: RecordLog, cancel: CancellationToken) {
    let mut pacer = Pacer::steady(PROGRESS_INTERVAL);
    let (mut last_ok, mut last_err) = (0, 0);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = pacer.tick() => {
                let (ok, err) = counters.snapshot();
                let collected = log.len().unwrap_or_default();
                info!(
                    "ok={ok} (+{}) err={err} (+{}) collected={collected}",
                    ok - last_ok,
                    err - last_err,
                );
                (last_ok, last_err) = (ok, err);
            }
        }
    }
}
