use crate::{
    ConfigError, RampSchedule, DEFAULT_FLOOR_RATE, DEFAULT_RECORD_CAPACITY, DEFAULT_TOKEN_CAPACITY,
    MAX_SCHEDULE,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

#[doc(hidden)]
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScenarioConfig {
    pub name: String,
    pub workers: usize,
    /// Hard stop for the run. Required for shapes that never finish on their own.
    pub duration: Option<Duration>,
    pub mode: Option<WorkerMode>,
    pub token_capacity: usize,
    pub record_capacity: usize,
    pub progress: bool,
}

impl ScenarioConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            workers: 1,
            duration: None,
            mode: None,
            token_capacity: DEFAULT_TOKEN_CAPACITY,
            record_capacity: DEFAULT_RECORD_CAPACITY,
            progress: true,
        }
    }

    pub fn dispatch(&self) -> Option<&Dispatch> {
        match &self.mode {
            Some(WorkerMode::Token(dispatch)) => Some(dispatch),
            _ => None,
        }
    }

    /// Reject configurations that cannot run. Called before any task starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.token_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("token queue"));
        }
        if self.record_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("record buffer"));
        }

        let mode = self.mode.as_ref().ok_or(ConfigError::NoWorkload)?;
        if let WorkerMode::Token(dispatch) = mode {
            if dispatch.scheduled_duration().is_some_and(|d| d > MAX_SCHEDULE) {
                return Err(ConfigError::TooLong("dispatch schedule"));
            }
        }
        match mode {
            WorkerMode::Token(Dispatch::Constant(ConstantRate {
                max_tokens: None, ..
            })) if self.duration.is_none() => Err(ConfigError::Unbounded("constant-rate dispatch")),
            WorkerMode::Token(Dispatch::Constant(ConstantRate {
                max_tokens: Some(0),
                ..
            })) => Err(ConfigError::Zero("token budget")),
            WorkerMode::Token(Dispatch::Burst(burst)) if burst.cycles == 0 => {
                Err(ConfigError::Zero("burst cycles"))
            }
            WorkerMode::Periodic(_) if self.duration.is_none() => {
                Err(ConfigError::Unbounded("periodic workers"))
            }
            WorkerMode::Periodic(periodic) if periodic.period.is_zero() => {
                Err(ConfigError::Zero("periodic period"))
            }
            WorkerMode::PhaseCycling(phase) => phase.validate(),
            WorkerMode::ParallelStreams(parallel) if parallel.streams == 0 => {
                Err(ConfigError::Zero("parallel streams"))
            }
            WorkerMode::ParallelStreams(parallel) if parallel.batches == 0 => {
                Err(ConfigError::Zero("parallel batches"))
            }
            _ => Ok(()),
        }
    }
}

/// How workers are driven.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WorkerMode {
    /// Workers wait for tokens from a dispatcher.
    Token(Dispatch),
    /// Each worker is its own rate source.
    Periodic(Periodic),
    /// Workers repeatedly acquire, use and release a connection.
    PhaseCycling(PhaseCycle),
    /// Workers fan out a fixed batch of concurrent requests and join on it.
    ParallelStreams(ParallelStreams),
}

/// Token emission policy.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Dispatch {
    Constant(ConstantRate),
    Burst(BurstCycle),
    Ramp(RampSchedule),
    Smooth(SmoothRamp),
}

impl Dispatch {
    /// Scheduled length, or `None` for an open-ended policy.
    pub fn scheduled_duration(&self) -> Option<Duration> {
        match self {
            Dispatch::Constant(_) => None,
            Dispatch::Burst(burst) => Some(burst.total_duration()),
            Dispatch::Ramp(ramp) => Some(ramp.total_duration()),
            Dispatch::Smooth(smooth) => Some(smooth.total_duration()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstantRate {
    pub rate: NonZeroU32,
    /// Finish once this many tokens have been enqueued.
    pub max_tokens: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BurstCycle {
    pub cycles: u32,
    pub idle: Duration,
    pub burst: Duration,
    pub rate: NonZeroU32,
}

impl BurstCycle {
    pub fn total_duration(&self) -> Duration {
        self.idle
            .saturating_add(self.burst)
            .saturating_mul(self.cycles)
    }
}

/// Linear ramp from zero to `peak_rate`, a sustained plateau, and a linear ramp back down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmoothRamp {
    pub ramp_up: Duration,
    pub sustain: Duration,
    pub ramp_down: Duration,
    pub peak_rate: NonZeroU32,
    /// The instantaneous rate never drops below this while ramping.
    pub floor_rate: u32,
}

impl SmoothRamp {
    pub fn new(ramp_up: Duration, sustain: Duration, ramp_down: Duration, peak_rate: NonZeroU32) -> Self {
        Self {
            ramp_up,
            sustain,
            ramp_down,
            peak_rate,
            floor_rate: DEFAULT_FLOOR_RATE,
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.ramp_up
            .saturating_add(self.sustain)
            .saturating_add(self.ramp_down)
    }

    /// Instantaneous target rate at `elapsed`, `None` once the profile is over.
    pub fn rate_at(&self, elapsed: Duration) -> Option<f64> {
        let peak = self.peak_rate.get() as f64;
        let floor = (self.floor_rate as f64).min(peak);
        let sustain_end = self.ramp_up.saturating_add(self.sustain);

        if elapsed < self.ramp_up {
            let progress = elapsed.as_secs_f64() / self.ramp_up.as_secs_f64();
            Some((peak * progress).max(floor))
        } else if elapsed < sustain_end {
            Some(peak)
        } else if elapsed < self.total_duration() {
            let progress = (elapsed - sustain_end).as_secs_f64() / self.ramp_down.as_secs_f64();
            Some((peak * (1. - progress)).max(floor))
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Periodic {
    pub period: Duration,
    /// Upper bound of the uniform random delay added to every period.
    pub jitter: Duration,
}

/// Connection lifecycle cadence for churn-style workers.
///
/// Each cycle runs `phases` phases; each phase acquires a fresh connection, issues
/// `requests_per_phase` requests on it and releases it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseCycle {
    pub cycles: u32,
    pub phases: u32,
    pub requests_per_phase: u32,
    /// Pause between requests on the same connection.
    pub request_interval: Duration,
    /// Pause after a phase's requests, before its connection is released. Skipped after the
    /// last phase of a cycle.
    pub phase_gap: Duration,
    /// Pause between cycles. Skipped after the last cycle.
    pub cycle_interval: Duration,
}

impl PhaseCycle {
    /// Short-lived connections: connect, send `requests` requests, disconnect, wait.
    pub fn churn(cycles: u32, requests: u32, cycle_interval: Duration) -> Self {
        Self {
            cycles,
            phases: 1,
            requests_per_phase: requests,
            request_interval: Duration::ZERO,
            phase_gap: Duration::ZERO,
            cycle_interval,
        }
    }

    /// A brand new connection for every request.
    pub fn cold_start(requests: u32, interval: Duration) -> Self {
        Self::churn(requests, 1, interval)
    }

    /// One long-lived connection carrying every request.
    pub fn warm(requests: u32, interval: Duration) -> Self {
        Self {
            cycles: 1,
            phases: 1,
            requests_per_phase: requests,
            request_interval: interval,
            phase_gap: Duration::ZERO,
            cycle_interval: Duration::ZERO,
        }
    }

    /// Two connections per cycle, switched after `gap`, approximating an address change.
    pub fn migration(cycles: u32, requests_per_phase: u32, gap: Duration) -> Self {
        Self {
            cycles,
            phases: 2,
            requests_per_phase,
            request_interval: Duration::ZERO,
            phase_gap: gap,
            cycle_interval: Duration::ZERO,
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.cycles as u64 * self.phases as u64 * self.requests_per_phase as u64
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cycles == 0 {
            Err(ConfigError::Zero("phase cycles"))
        } else if self.phases == 0 {
            Err(ConfigError::Zero("phases per cycle"))
        } else if self.requests_per_phase == 0 {
            Err(ConfigError::Zero("requests per phase"))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParallelStreams {
    pub batches: u32,
    pub streams: u32,
    /// Pause between batches. Skipped after the last batch.
    pub batch_interval: Duration,
}

/// Scenario shape selector, as named on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModeKind {
    Constant,
    Burst,
    Ramp,
    Smooth,
    Periodic,
    Churn,
    Cold,
    Warm,
    Migration,
    Parallel,
    Mixed,
}

impl ModeKind {
    pub const ALL: [ModeKind; 11] = [
        ModeKind::Constant,
        ModeKind::Burst,
        ModeKind::Ramp,
        ModeKind::Smooth,
        ModeKind::Periodic,
        ModeKind::Churn,
        ModeKind::Cold,
        ModeKind::Warm,
        ModeKind::Migration,
        ModeKind::Parallel,
        ModeKind::Mixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModeKind::Constant => "constant",
            ModeKind::Burst => "burst",
            ModeKind::Ramp => "ramp",
            ModeKind::Smooth => "smooth",
            ModeKind::Periodic => "periodic",
            ModeKind::Churn => "churn",
            ModeKind::Cold => "cold",
            ModeKind::Warm => "warm",
            ModeKind::Migration => "migration",
            ModeKind::Parallel => "parallel",
            ModeKind::Mixed => "mixed",
        }
    }

    /// Whether the shape relies on fresh connections per phase.
    pub fn reconnects(&self) -> bool {
        matches!(self, ModeKind::Churn | ModeKind::Cold | ModeKind::Migration)
    }
}

impl FromStr for ModeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ModeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == needle)
            .ok_or_else(|| ConfigError::UnknownMode(s.to_string()))
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Constant(c) => match c.max_tokens {
                Some(max) => write!(f, "constant {} rps (budget {max})", c.rate),
                None => write!(f, "constant {} rps", c.rate),
            },
            Dispatch::Burst(b) => write!(
                f,
                "{} x (idle {} + burst {} @ {} rps)",
                b.cycles,
                humantime::format_duration(b.idle),
                humantime::format_duration(b.burst),
                b.rate
            ),
            Dispatch::Ramp(r) => write!(f, "ramp {r}"),
            Dispatch::Smooth(s) => write!(
                f,
                "smooth 0->{} rps over {}, hold {}, down over {}",
                s.peak_rate,
                humantime::format_duration(s.ramp_up),
                humantime::format_duration(s.sustain),
                humantime::format_duration(s.ramp_down)
            ),
        }
    }
}
