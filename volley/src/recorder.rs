use crate::counters::Counters;
use crate::operation::{RequestOp, RunContext};
use std::fmt::Display;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::Record;

#[cfg(feature = "metrics")]
pub(crate) const LATENCY_METRIC: &str = "volley.latency";
#[cfg(feature = "metrics")]
pub(crate) const SUCCESS_METRIC: &str = "volley.success";
#[cfg(feature = "metrics")]
pub(crate) const ERROR_METRIC: &str = "volley.error";

/// Times requests and feeds the outcome into the counters and the record stream.
#[derive(Clone)]
pub(crate) struct Recorder {
    cx: RunContext,
    counters: Counters,
    records: mpsc::Sender<Record>,
}

impl Recorder {
    pub fn new(cx: RunContext, counters: Counters, records: mpsc::Sender<Record>) -> Self {
        Self {
            cx,
            counters,
            records,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.cx
    }

    /// Run one request and record it. Returns whether it succeeded.
    pub async fn perform<O: RequestOp>(&self, op: &O) -> bool {
        let id = self.counters.next_id();
        let started = SystemTime::now();
        let start = Instant::now();
        let res = op.call(&self.cx, id).await;
        let elapsed = start.elapsed();

        self.observe(id, started, elapsed, res)
    }

    /// Record a failed connection attempt as one failed request.
    pub fn connect_failed<E: Display>(&self, started: SystemTime, elapsed: Duration, err: E) {
        let id = self.counters.next_id();
        self.observe::<E>(id, started, elapsed, Err(err));
    }

    fn observe<E: Display>(
        &self,
        id: u64,
        started: SystemTime,
        elapsed: Duration,
        res: Result<usize, E>,
    ) -> bool {
        #[cfg(feature = "metrics")]
        metrics::histogram!(LATENCY_METRIC, "scenario" => self.cx.scenario().to_string())
            .record(elapsed.as_nanos() as f64);

        let ok = match res {
            Ok(size) => {
                self.counters.success();
                #[cfg(feature = "metrics")]
                metrics::counter!(SUCCESS_METRIC, "scenario" => self.cx.scenario().to_string())
                    .increment(1);
                trace!(id, size, latency = ?elapsed, "request ok");
                true
            }
            Err(err) => {
                if let Some(n) = self.counters.failure() {
                    warn!(
                        "request {id} failed after {}: {err} (failure #{n})",
                        humantime::format_duration(elapsed)
                    );
                }
                #[cfg(feature = "metrics")]
                metrics::counter!(ERROR_METRIC, "scenario" => self.cx.scenario().to_string())
                    .increment(1);
                trace!(id, latency = ?elapsed, "request failed");
                false
            }
        };

        match self.records.try_send(Record::new(started, elapsed, ok)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.counters.record_dropped(),
            Err(TrySendError::Closed(_)) => {
                error!("Record stream closed while workers are still running");
                self.counters.record_dropped();
            }
        }

        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn recorder(capacity: usize) -> (Recorder, Counters, mpsc::Receiver<Record>) {
        let counters = Counters::new();
        let (tx, rx) = mpsc::channel(capacity);
        let cx = RunContext::new("recorder", CancellationToken::new());
        (Recorder::new(cx, counters.clone(), tx), counters, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn times_the_operation() {
        let (recorder, counters, mut rx) = recorder(8);
        let op = |_cx: RunContext, _id: u64| async {
            tokio::time::sleep(Duration::from_millis(3)).await;
            Ok::<usize, String>(64)
        };

        assert!(recorder.perform(&op).await);
        let record = rx.recv().await.unwrap();
        assert!(record.ok);
        assert!(record.latency >= Duration::from_millis(3));
        assert!(record.latency < Duration::from_millis(4));
        assert_eq!(counters.snapshot(), (1, 0));
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn failures_are_throttled() {
        let (recorder, counters, _rx) = recorder(4_096);
        let op = |_cx: RunContext, _id: u64| async { Err::<usize, _>("refused") };

        for _ in 0..1_500 {
            assert!(!recorder.perform(&op).await);
        }

        assert_eq!(counters.totals().err_logged, 11);
        assert!(logs_contain("failure #10)"));
        assert!(logs_contain("failure #1000)"));
        assert!(!logs_contain("failure #11)"));
    }

    #[tokio::test]
    async fn full_stream_drops_records() {
        let (recorder, counters, mut rx) = recorder(2);
        let op = |_cx: RunContext, _id: u64| async { Ok::<usize, String>(1) };

        for _ in 0..5 {
            recorder.perform(&op).await;
        }

        let totals = counters.totals();
        assert_eq!(totals.ok, 5);
        assert_eq!(totals.records_dropped, 3);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn connect_failures_are_records() {
        let (recorder, counters, mut rx) = recorder(2);
        recorder.connect_failed(SystemTime::now(), Duration::from_millis(7), "handshake timeout");

        let record = rx.recv().await.unwrap();
        assert!(!record.ok);
        assert_eq!(record.latency, Duration::from_millis(7));
        assert_eq!(counters.snapshot(), (0, 1));
    }
}
