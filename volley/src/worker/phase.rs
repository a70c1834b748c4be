use super::pause;
use crate::operation::Connector;
use crate::recorder::Recorder;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::PhaseCycle;

/// Connection-cycling worker.
///
/// Each phase acquires a fresh connection, sends its requests, waits out the phase gap and
/// releases the connection. A connection that cannot be established counts as one failed
/// request and its phase is skipped.
pub(crate) async fn run<C: Connector>(
    worker: usize,
    recorder: Recorder,
    connector: Arc<C>,
    config: PhaseCycle,
) {
    debug!("Phase worker {worker} started");
    let cancel = recorder.context().token().clone();

    'cycles: for cycle in 0..config.cycles {
        for phase in 0..config.phases {
            if cancel.is_cancelled() {
                break 'cycles;
            }

            let started = SystemTime::now();
            let start = Instant::now();
            let conn = match connector.connect().await {
                Ok(conn) => conn,
                Err(err) => {
                    warn!("Worker {worker} failed to connect (cycle {cycle}, phase {phase}): {err}");
                    recorder.connect_failed(started, start.elapsed(), err);
                    continue;
                }
            };
            trace!(worker, cycle, phase, "connected");

            let mut interrupted = false;
            for i in 0..config.requests_per_phase {
                if i > 0 && !pause(&cancel, config.request_interval).await {
                    interrupted = true;
                    break;
                }
                if cancel.is_cancelled() {
                    interrupted = true;
                    break;
                }
                recorder.perform(&conn).await;
            }

            let last_phase = phase + 1 == config.phases;
            if !interrupted && !last_phase && !pause(&cancel, config.phase_gap).await {
                interrupted = true;
            }

            connector.release(conn).await;
            trace!(worker, cycle, phase, "released");

            if interrupted {
                break 'cycles;
            }
        }

        let last_cycle = cycle + 1 == config.cycles;
        if !last_cycle && !pause(&cancel, config.cycle_interval).await {
            break;
        }
    }

    debug!("Phase worker {worker} finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::RunContext;
    use crate::worker::test_utils::Harness;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Tally {
        connects: AtomicU64,
        releases: AtomicU64,
        requests: Arc<AtomicU64>,
    }

    struct Counting {
        tally: Arc<Tally>,
        fail: bool,
    }

    struct CountingOp(Arc<AtomicU64>);

    impl crate::operation::RequestOp for CountingOp {
        type Error = String;

        fn call(
            &self,
            _cx: &RunContext,
            _id: u64,
        ) -> impl std::future::Future<Output = Result<usize, String>> + Send {
            self.0.fetch_add(1, Ordering::Relaxed);
            async { Ok(64) }
        }
    }

    impl Connector for Counting {
        type Op = CountingOp;
        type Error = &'static str;

        fn connect(&self) -> impl std::future::Future<Output = Result<CountingOp, &'static str>> + Send {
            self.tally.connects.fetch_add(1, Ordering::Relaxed);
            let result = if self.fail {
                Err("handshake refused")
            } else {
                Ok(CountingOp(self.tally.requests.clone()))
            };
            async move {
                tokio::time::sleep(Duration::from_millis(2)).await;
                result
            }
        }

        fn release(&self, _op: CountingOp) -> impl std::future::Future<Output = ()> + Send {
            self.tally.releases.fetch_add(1, Ordering::Relaxed);
            async {}
        }
    }

    fn connector(fail: bool) -> (Arc<Counting>, Arc<Tally>) {
        let tally = Arc::new(Tally::default());
        let connector = Arc::new(Counting {
            tally: tally.clone(),
            fail,
        });
        (connector, tally)
    }

    #[tokio::test(start_paused = true)]
    async fn churn_cadence() {
        let mut harness = Harness::new();
        let (connector, tally) = connector(false);
        let start = Instant::now();

        run(
            0,
            harness.recorder.clone(),
            connector,
            PhaseCycle::churn(3, 2, Duration::from_millis(500)),
        )
        .await;

        assert_eq!(tally.connects.load(Ordering::Relaxed), 3);
        assert_eq!(tally.releases.load(Ordering::Relaxed), 3);
        assert_eq!(tally.requests.load(Ordering::Relaxed), 6);
        assert_eq!(harness.drain().len(), 6);
        // Two pauses between three cycles, none after the last.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1_000));
        assert!(elapsed < Duration::from_millis(1_100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn migration_switches_connections() {
        let mut harness = Harness::new();
        let (connector, tally) = connector(false);
        let start = Instant::now();

        run(
            0,
            harness.recorder.clone(),
            connector,
            PhaseCycle::migration(2, 3, Duration::from_secs(1)),
        )
        .await;

        assert_eq!(tally.connects.load(Ordering::Relaxed), 4);
        assert_eq!(tally.releases.load(Ordering::Relaxed), 4);
        assert_eq!(harness.drain().len(), 12);
        // One gap per cycle, between its two connections.
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_millis(2_100));
    }

    #[tokio::test(start_paused = true)]
    async fn warm_connection_spacing() {
        let mut harness = Harness::new();
        let (connector, tally) = connector(false);
        let start = Instant::now();

        run(
            0,
            harness.recorder.clone(),
            connector,
            PhaseCycle::warm(10, Duration::from_millis(30)),
        )
        .await;

        assert_eq!(tally.connects.load(Ordering::Relaxed), 1);
        assert_eq!(harness.drain().len(), 10);
        assert!(start.elapsed() >= Duration::from_millis(270));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_connects_are_failed_records() {
        let mut harness = Harness::new();
        let (connector, tally) = connector(true);

        run(
            0,
            harness.recorder.clone(),
            connector,
            PhaseCycle::churn(4, 2, Duration::ZERO),
        )
        .await;

        let records = harness.drain();
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| !r.ok));
        assert!(records.iter().all(|r| r.latency >= Duration::from_millis(2)));
        assert_eq!(tally.requests.load(Ordering::Relaxed), 0);
        assert_eq!(tally.releases.load(Ordering::Relaxed), 0);
        assert_eq!(harness.counters.snapshot(), (0, 4));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_releases_the_connection() {
        let harness = Harness::new();
        let (connector, tally) = connector(false);

        let worker = tokio::spawn(run(
            0,
            harness.recorder.clone(),
            connector,
            PhaseCycle::warm(1_000, Duration::from_millis(100)),
        ));
        tokio::time::sleep(Duration::from_millis(350)).await;
        harness.cancel.cancel();
        worker.await.unwrap();

        assert_eq!(tally.connects.load(Ordering::Relaxed), 1);
        assert_eq!(tally.releases.load(Ordering::Relaxed), 1);
        assert_eq!(tally.requests.load(Ordering::Relaxed), 4);
    }
}
