mod utils;
#[allow(unused)]
use utils::*;

use mock_endpoint::MockEndpoint;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::Instant;
use volley::prelude::*;
use volley::ConfigError;

#[tokio::test]
#[ntest::timeout(10_000)]
async fn failing_endpoint() {
    init();

    let report = Scenario::from_op("errors", MockEndpoint::fixed(Duration::from_millis(1)).failing())
        .workers(2)
        .constant_rate(NonZeroU32::new(200).unwrap())
        .token_budget(100)
        .await
        .unwrap();

    let summary = &report.summary;
    assert_eq!(summary.samples, 100);
    assert_eq!(summary.ok_rate_pct, 0.);
    assert!(summary.p50_ms.is_finite());
    assert_eq!(report.totals.err, 100);
    assert_eq!(report.totals.err_logged, 10);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn limited_endpoint_sheds_load() {
    init();

    let endpoint = MockEndpoint::fixed(Duration::from_millis(1)).limited(NonZeroU32::new(200).unwrap());
    let report = Scenario::from_op("limited", endpoint)
        .workers(8)
        .constant_rate(NonZeroU32::new(1_000).unwrap())
        .duration(Duration::from_secs(1))
        .await
        .unwrap();

    let totals = report.totals;
    assert!(totals.err > 0, "{totals:?}");
    // 200/s plus the limiter's initial burst.
    assert!(totals.ok <= 450, "{totals:?}");
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn external_cancellation_stops_the_run() {
    init();

    let stop = CancellationToken::new();
    let trigger = stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let report = Scenario::from_op("interrupted", MockEndpoint::fixed(Duration::from_millis(1)))
        .workers(4)
        .constant_rate(NonZeroU32::new(100).unwrap())
        .duration(Duration::from_secs(60))
        .cancel_on(stop)
        .await
        .unwrap();

    assert!(report.interrupted);
    assert!(start.elapsed() < Duration::from_secs(5));
    assert!(report.summary.samples <= 35, "{}", report.summary);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    init();

    let res = Scenario::from_op("no-workers", MockEndpoint::fixed(Duration::ZERO))
        .workers(0)
        .constant_rate(NonZeroU32::new(100).unwrap())
        .duration(Duration::from_secs(1))
        .await;
    assert!(matches!(res, Err(RunError::Config(ConfigError::NoWorkers))));

    let res = Scenario::from_op("bad-ramp", MockEndpoint::fixed(Duration::ZERO))
        .ramp_str("ten@100")
        .await;
    assert!(matches!(res, Err(RunError::Config(ConfigError::BadSeconds(_)))));
}
