use super::pause;
use crate::operation::RequestOp;
use crate::recorder::Recorder;
use std::sync::Arc;
use tokio::task::JoinSet;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::ParallelStreams;

/// Fan out `streams` concurrent requests per batch and join on all of them.
///
/// Cancellation aborts the batch in flight.
pub(crate) async fn run<O: RequestOp>(
    worker: usize,
    recorder: Recorder,
    op: Arc<O>,
    config: ParallelStreams,
) {
    debug!("Parallel worker {worker} started");
    let cancel = recorder.context().token().clone();

    for batch in 0..config.batches {
        if cancel.is_cancelled() {
            break;
        }

        let mut streams = JoinSet::new();
        for _ in 0..config.streams {
            let recorder = recorder.clone();
            let op = op.clone();
            streams.spawn(async move { recorder.perform(&*op).await });
        }

        let mut ok = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    streams.abort_all();
                    while streams.join_next().await.is_some() {}
                    debug!("Parallel worker {worker} aborted batch {batch}");
                    return;
                }
                joined = streams.join_next() => match joined {
                    Some(Ok(true)) => ok += 1,
                    Some(Ok(false)) => {}
                    Some(Err(err)) => error!("Stream task failed: {err}"),
                    None => break,
                }
            }
        }
        trace!(worker, batch, ok, "batch joined");

        let last_batch = batch + 1 == config.batches;
        if !last_batch && !pause(&cancel, config.batch_interval).await {
            break;
        }
    }

    debug!("Parallel worker {worker} finished");
}
