#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// One measured request outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record {
    /// Wall-clock instant the request began, in Unix nanoseconds.
    pub ts_unix_ns: i64,
    pub latency: Duration,
    pub ok: bool,
}

impl Record {
    pub fn new(started: SystemTime, latency: Duration, ok: bool) -> Self {
        let ts_unix_ns = match started.duration_since(UNIX_EPOCH) {
            Ok(since) => since.as_nanos() as i64,
            Err(before) => -(before.duration().as_nanos() as i64),
        };

        Self {
            ts_unix_ns,
            latency,
            ok,
        }
    }

    /// The integer Unix second the request began in.
    pub fn unix_second(&self) -> i64 {
        self.ts_unix_ns.div_euclid(NANOS_PER_SEC)
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency.as_nanos() as f64 / 1e6
    }
}

/// Permission for one unit of work to run now. Carries no payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchToken;

/// One `(duration, rate)` segment of a multi-stage ramp. A rate of zero is an idle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stage {
    pub duration: Duration,
    pub rate: u32,
}

impl Stage {
    pub fn new(duration: Duration, rate: u32) -> Self {
        Self { duration, rate }
    }

    pub fn is_idle(&self) -> bool {
        self.rate == 0
    }

    /// Time between tokens for this stage, or `None` for an idle stage.
    pub fn interval(&self) -> Option<Duration> {
        rate_interval(self.rate)
    }
}

/// `1s / rate`, clamped to at least one nanosecond. `None` when the rate is zero.
pub fn rate_interval(rate: u32) -> Option<Duration> {
    if rate == 0 {
        None
    } else {
        Some((Duration::from_secs(1) / rate).max(Duration::from_nanos(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_seconds_truncate() {
        let started = UNIX_EPOCH + Duration::from_millis(1_700_000_000_999);
        let record = Record::new(started, Duration::from_micros(1_500), true);
        assert_eq!(record.unix_second(), 1_700_000_000);
        assert_eq!(record.latency_ms(), 1.5);
    }

    #[test]
    fn pre_epoch_records_are_negative() {
        let started = UNIX_EPOCH - Duration::from_millis(500);
        let record = Record::new(started, Duration::ZERO, false);
        assert_eq!(record.ts_unix_ns, -500_000_000);
        assert_eq!(record.unix_second(), -1);
    }

    #[test]
    fn stage_intervals() {
        assert_eq!(
            Stage::new(Duration::from_secs(1), 1000).interval(),
            Some(Duration::from_millis(1))
        );
        assert!(Stage::new(Duration::from_secs(1), 0).is_idle());
        assert_eq!(rate_interval(0), None);
        assert_eq!(rate_interval(u32::MAX), Some(Duration::from_nanos(1)));
    }
}
