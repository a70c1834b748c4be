use crate::operation::RequestOp;
use crate::recorder::Recorder;
use async_channel::Receiver;
use std::sync::Arc;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::DispatchToken;

/// Perform one request per token until cancelled or the queue is closed and drained.
pub(crate) async fn run<O: RequestOp>(
    worker: usize,
    recorder: Recorder,
    op: Arc<O>,
    tokens: Receiver<DispatchToken>,
) {
    debug!("Token worker {worker} started");
    let cancel = recorder.context().token().clone();
    let mut performed = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            token = tokens.recv() => match token {
                Ok(DispatchToken) => {
                    recorder.perform(&*op).await;
                    performed += 1;
                }
                Err(_) => break,
            }
        }
    }

    debug!("Token worker {worker} finished after {performed} requests");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::RunContext;
    use crate::worker::test_utils::Harness;
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn drains_then_exits_on_close() {
        let mut harness = Harness::new();
        let (tx, rx) = async_channel::bounded(16);
        for _ in 0..5 {
            tx.try_send(DispatchToken).unwrap();
        }
        drop(tx);

        let op = Arc::new(|_cx: RunContext, _id: u64| async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            Ok::<usize, String>(512)
        });
        run(0, harness.recorder.clone(), op, rx).await;

        assert_eq!(harness.drain().len(), 5);
        assert_eq!(harness.counters.snapshot(), (5, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn pool_shares_the_queue() {
        let mut harness = Harness::new();
        let (tx, rx) = async_channel::bounded(64);
        for _ in 0..40 {
            tx.try_send(DispatchToken).unwrap();
        }
        drop(tx);

        let op = Arc::new(|_cx: RunContext, _id: u64| async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<usize, String>(1)
        });

        let start = Instant::now();
        let workers: Vec<_> = (0..4)
            .map(|i| tokio::spawn(run(i, harness.recorder.clone(), op.clone(), rx.clone())))
            .collect();
        for worker in workers {
            worker.await.unwrap();
        }

        assert_eq!(harness.drain().len(), 40);
        assert!(start.elapsed() < Duration::from_millis(120));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_cancel_with_open_queue() {
        let harness = Harness::new();
        let (_tx, rx) = async_channel::bounded::<DispatchToken>(16);
        let op = Arc::new(|_cx: RunContext, _id: u64| async { Ok::<usize, String>(1) });

        let worker = tokio::spawn(run(0, harness.recorder.clone(), op, rx));
        tokio::time::sleep(Duration::from_millis(10)).await;
        harness.cancel.cancel();
        worker.await.unwrap();
        assert_eq!(harness.counters.snapshot(), (0, 0));
    }
}
