use std::time::Duration;

/// Default capacity of the dispatcher → worker token queue.
pub const DEFAULT_TOKEN_CAPACITY: usize = 1 << 16;

/// Default capacity of the worker → collector record stream.
pub const DEFAULT_RECORD_CAPACITY: usize = 1 << 20;

/// Every failure up to this count is logged.
pub const ERROR_LOG_FIRST_N: u64 = 10;

/// After [`ERROR_LOG_FIRST_N`], only every Mth failure is logged.
pub const ERROR_LOG_EVERY_M: u64 = 1000;

/// Lowest instantaneous rate used by the smooth ramp profile.
pub const DEFAULT_FLOOR_RATE: u32 = 100;

/// Granularity at which the smooth ramp profile accrues token credit.
pub const SMOOTH_TICK: Duration = Duration::from_millis(1);

/// Longest traffic schedule accepted: one stage, a whole ramp or all burst cycles.
pub const MAX_SCHEDULE: Duration = Duration::from_secs(366 * 24 * 60 * 60);

pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);
