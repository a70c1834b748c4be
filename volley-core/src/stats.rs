use crate::Record;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Smallest observed span, in seconds, used when every record shares one timestamp.
const MIN_DURATION_S: f64 = 1e-9;

/// Aggregate statistics for a completed run.
///
/// A pure function of the [`Record`] list it was built from: recomputing from the same list
/// yields identical values. Latency figures are in milliseconds, rounded to 6 decimal places.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Summary {
    pub samples: usize,
    pub ok_rate_pct: f64,
    /// Requests per second over the observed span.
    pub rps: f64,
    /// Observed span between the first and last request start, in seconds.
    pub duration_s: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    /// Sorted latencies; the CDF X axis.
    pub cdf_x_ms: Vec<f64>,
    /// Cumulative fraction for each entry of `cdf_x_ms`.
    pub cdf_y: Vec<f64>,
    /// Every Unix second from the first to the last observed request start.
    pub throughput_ts: Vec<i64>,
    /// Requests started in the matching `throughput_ts` second.
    pub throughput_val: Vec<usize>,
}

impl Summary {
    pub fn from_records(records: &[Record]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut min_ts = i64::MAX;
        let mut max_ts = i64::MIN;
        let mut ok_count = 0;
        let mut latencies = Vec::with_capacity(records.len());
        let mut per_second: BTreeMap<i64, usize> = BTreeMap::new();

        for record in records {
            min_ts = min_ts.min(record.ts_unix_ns);
            max_ts = max_ts.max(record.ts_unix_ns);
            if record.ok {
                ok_count += 1;
            }
            latencies.push(record.latency_ms());
            *per_second.entry(record.unix_second()).or_default() += 1;
        }

        let n = records.len();
        let mean = statistical::mean(&latencies);

        let duration_s = ((max_ts - min_ts) as f64 / 1e9).max(MIN_DURATION_S);
        let rps = n as f64 / duration_s;

        latencies.sort_by(f64::total_cmp);
        let cdf_y = (0..n).map(|i| (i + 1) as f64 / n as f64).collect();

        let (throughput_ts, throughput_val) = dense_series(&per_second);

        Self {
            samples: n,
            ok_rate_pct: 100. * ok_count as f64 / n as f64,
            rps,
            duration_s,
            p50_ms: round6(interpolate(&latencies, 0.50)),
            p90_ms: round6(interpolate(&latencies, 0.90)),
            p95_ms: round6(interpolate(&latencies, 0.95)),
            p99_ms: round6(interpolate(&latencies, 0.99)),
            mean_ms: round6(mean),
            min_ms: round6(latencies[0]),
            max_ms: round6(latencies[n - 1]),
            cdf_x_ms: latencies,
            cdf_y,
            throughput_ts,
            throughput_val,
        }
    }

    /// Latency at quantile `p` (clamped to `[0, 1]`), in milliseconds rounded to 6 places.
    ///
    /// Returns 0 for an empty summary.
    pub fn percentile(&self, p: f64) -> f64 {
        if self.cdf_x_ms.is_empty() {
            return 0.;
        }
        round6(interpolate(&self.cdf_x_ms, p.clamp(0., 1.)))
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "samples={} ok_rate={:.2}% rps={:.2} p50={:.6}ms p90={:.6}ms p95={:.6}ms p99={:.6}ms",
            self.samples,
            self.ok_rate_pct,
            self.rps,
            self.p50_ms,
            self.p90_ms,
            self.p95_ms,
            self.p99_ms,
        )
    }
}

/// Linear interpolation between the closest ranks at fractional rank `p * (n - 1)`.
///
/// `sorted` must be non-empty and ascending.
fn interpolate(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let i = pos.floor() as usize;
    let frac = pos - i as f64;
    if i + 1 < sorted.len() {
        sorted[i] + frac * (sorted[i + 1] - sorted[i])
    } else {
        sorted[sorted.len() - 1]
    }
}

fn dense_series(per_second: &BTreeMap<i64, usize>) -> (Vec<i64>, Vec<usize>) {
    let (Some((&first, _)), Some((&last, _))) =
        (per_second.first_key_value(), per_second.last_key_value())
    else {
        return (vec![], vec![]);
    };

    (first..=last)
        .map(|sec| (sec, per_second.get(&sec).copied().unwrap_or(0)))
        .unzip()
}

pub fn round6(x: f64) -> f64 {
    const P: f64 = 1e6;
    (x * P).round() / P
}
