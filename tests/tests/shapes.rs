mod utils;
#[allow(unused)]
use utils::*;

use mock_endpoint::MockEndpoint;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::Instant;
use volley::prelude::*;

fn endpoint_1ms() -> MockEndpoint {
    MockEndpoint::fixed(Duration::from_millis(1))
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn constant_rate_baseline() {
    init();

    let report = Scenario::from_op("baseline", endpoint_1ms())
        .workers(4)
        .constant_rate(NonZeroU32::new(100).unwrap())
        .duration(Duration::from_secs(2))
        .await
        .unwrap();

    let summary = &report.summary;
    assert!((180..=200).contains(&summary.samples), "{summary}");
    assert_eq!(summary.ok_rate_pct, 100.);
    assert!(summary.p50_ms >= 1., "{summary}");
    assert!(summary.p50_ms < 50., "{summary}");
    assert!(summary.min_ms >= 1., "{summary}");
    assert!(summary.p50_ms <= summary.p99_ms);
    assert!(summary.p99_ms <= summary.max_ms);
    assert_eq!(summary.throughput_val.iter().sum::<usize>(), summary.samples);
    assert!(report.interrupted);

    let dispatch = report.dispatch.unwrap();
    assert_eq!(dispatch.dropped, 0);
    assert!(dispatch.enqueued as usize >= summary.samples);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn budget_finishes_early() {
    init();

    let start = Instant::now();
    let report = Scenario::from_op("budget", endpoint_1ms())
        .workers(8)
        .constant_rate(NonZeroU32::new(1_000).unwrap())
        .token_budget(300)
        .await
        .unwrap();

    assert_eq!(report.summary.samples, 300);
    assert_eq!(report.totals.ok, 300);
    assert!(!report.interrupted);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn burst_cycles() {
    init();

    let start = Instant::now();
    let report = Scenario::from_op("burst", endpoint_1ms())
        .workers(4)
        .burst(BurstCycle {
            cycles: 2,
            idle: Duration::from_millis(300),
            burst: Duration::from_millis(300),
            rate: NonZeroU32::new(200).unwrap(),
        })
        .await
        .unwrap();

    // Two 300ms bursts at 200/s.
    assert!((100..=120).contains(&report.summary.samples), "{}", report.summary);
    assert!(start.elapsed() >= Duration::from_millis(1_200));
    assert!(!report.interrupted);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn ramp_schedule() {
    init();

    let report = Scenario::from_op("ramp", endpoint_1ms())
        .workers(4)
        .ramp_str("1@50,1@0,1@100")
        .await
        .unwrap();

    let summary = &report.summary;
    assert!((135..=150).contains(&summary.samples), "{summary}");
    assert!(report.elapsed >= Duration::from_secs(3));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn smooth_ramp_peaks_and_falls() {
    init();

    let profile = SmoothRamp::new(
        Duration::from_secs(1),
        Duration::from_secs(1),
        Duration::from_secs(1),
        NonZeroU32::new(200).unwrap(),
    );
    let report = Scenario::from_op("smooth", endpoint_1ms())
        .workers(8)
        .smooth_ramp(profile)
        .await
        .unwrap();

    // Each ramp holds the 100/s floor for its first half: 125 + 200 + 125.
    let samples = report.summary.samples;
    assert!((400..=470).contains(&samples), "{samples}");
    assert!(!report.interrupted);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn periodic_with_jitter() {
    init();

    let report = Scenario::from_op("low-traffic", endpoint_1ms())
        .workers(10)
        .periodic(Duration::from_millis(100), Duration::from_millis(50))
        .duration(Duration::from_secs(1))
        .await
        .unwrap();

    // Each worker fires every 100-150ms.
    let samples = report.summary.samples;
    assert!((60..=110).contains(&samples), "{samples}");
    assert!(report.dispatch.is_none());
}
