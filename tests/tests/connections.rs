mod utils;
#[allow(unused)]
use utils::*;

use mock_endpoint::{MockConnector, MockEndpoint};
use std::time::Duration;
use tokio::time::Instant;
use volley::prelude::*;

fn connector() -> MockConnector<impl Fn() -> MockEndpoint + Send + Sync + 'static> {
    MockConnector::new(|| MockEndpoint::fixed(Duration::from_millis(1)))
        .handshake(Duration::from_millis(2))
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn churn_reconnects_every_cycle() {
    init();

    let connector = connector();
    let stats = connector.stats();

    let report = Scenario::new("churn", connector)
        .workers(2)
        .phase_cycling(PhaseCycle::churn(3, 2, Duration::from_millis(100)))
        .await
        .unwrap();

    assert_eq!(stats.connects(), 6);
    assert_eq!(stats.releases(), 6);
    assert_eq!(report.summary.samples, 12);
    assert_eq!(report.summary.ok_rate_pct, 100.);
    assert!(report.elapsed >= Duration::from_millis(200));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn migration_switches_connection_mid_cycle() {
    init();

    let connector = connector();
    let stats = connector.stats();

    let start = Instant::now();
    let report = Scenario::new("nat-rebinding", connector)
        .phase_cycling(PhaseCycle::migration(2, 3, Duration::from_millis(200)))
        .await
        .unwrap();

    assert_eq!(stats.connects(), 4);
    assert_eq!(stats.releases(), 4);
    assert_eq!(report.summary.samples, 12);
    // One gap inside each cycle.
    assert!(start.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn cold_start_connects_per_request() {
    init();

    let connector = connector();
    let stats = connector.stats();

    let report = Scenario::new("cold", connector)
        .phase_cycling(PhaseCycle::cold_start(5, Duration::from_millis(10)))
        .await
        .unwrap();

    assert_eq!(stats.connects(), 5);
    assert_eq!(report.summary.samples, 5);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn warm_reuses_one_connection() {
    init();

    let connector = connector();
    let stats = connector.stats();

    let report = Scenario::new("warm", connector)
        .phase_cycling(PhaseCycle::warm(5, Duration::from_millis(10)))
        .await
        .unwrap();

    assert_eq!(stats.connects(), 1);
    assert_eq!(stats.releases(), 1);
    assert_eq!(report.summary.samples, 5);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn refused_connects_are_failures() {
    init();

    let connector = connector().refusing();
    let stats = connector.stats();

    let report = Scenario::new("refused", connector)
        .phase_cycling(PhaseCycle::churn(2, 2, Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(stats.refused(), 2);
    assert_eq!(stats.releases(), 0);
    assert_eq!(report.summary.samples, 2);
    assert_eq!(report.summary.ok_rate_pct, 0.);
    assert_eq!(report.totals.err, 2);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn parallel_streams_share_one_connection() {
    init();

    let report = Scenario::from_op("parallel", MockEndpoint::fixed(Duration::from_millis(5)))
        .workers(2)
        .parallel_streams(ParallelStreams {
            batches: 5,
            streams: 10,
            batch_interval: Duration::from_millis(20),
        })
        .await
        .unwrap();

    assert_eq!(report.summary.samples, 100);
    assert_eq!(report.summary.ok_rate_pct, 100.);
    assert!(report.summary.min_ms >= 5.);
}
