use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use volley_core::rate_interval;

/// Fixed-period tick source.
///
/// The first tick fires one period after creation. A paced pacer delivers missed ticks late
/// instead of skipping them, so over any span `T` it yields at most `T / period` ticks.
pub(crate) struct Pacer {
    interval: Interval,
    period: Duration,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        Self::with_behavior(period, MissedTickBehavior::Burst)
    }

    pub fn rate(rate: NonZeroU32) -> Self {
        let period = rate_interval(rate.get()).unwrap_or(Duration::from_nanos(1));
        Self::new(period)
    }

    /// Reporting cadence: late ticks push the schedule back rather than catching up.
    pub fn steady(period: Duration) -> Self {
        Self::with_behavior(period, MissedTickBehavior::Delay)
    }

    fn with_behavior(period: Duration, behavior: MissedTickBehavior) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(behavior);
        Self { interval, period }
    }

    /// Waits for the next tick and returns its scheduled instant.
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

impl std::fmt::Display for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", humantime::format_duration(self.period))
    }
}
