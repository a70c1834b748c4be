use crate::{ConfigError, Stage, MAX_SCHEDULE};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Ordered, non-empty list of [`Stage`]s.
///
/// Parsed from `"<seconds>@<rate>[,<seconds>@<rate>...]"`, e.g. `"30@1000,30@2000,30@4000"`.
/// Empty segments (such as a trailing comma) are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RampSchedule {
    stages: Vec<Stage>,
    total: Duration,
}

impl RampSchedule {
    pub fn new(stages: Vec<Stage>) -> Result<Self, ConfigError> {
        if stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        let total = stages
            .iter()
            .try_fold(Duration::ZERO, |total, s| total.checked_add(s.duration))
            .filter(|total| *total <= MAX_SCHEDULE)
            .ok_or(ConfigError::TooLong("ramp schedule"))?;
        Ok(Self { stages, total })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.total
    }

    /// Scheduled rate at `elapsed` into the ramp, `None` once the schedule is exhausted.
    pub fn rate_at(&self, elapsed: Duration) -> Option<u32> {
        let mut cumulative = Duration::ZERO;
        for stage in &self.stages {
            cumulative += stage.duration;
            if elapsed < cumulative {
                return Some(stage.rate);
            }
        }
        None
    }
}

impl FromStr for RampSchedule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut stages = vec![];
        for part in s.trim().split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            stages.push(parse_stage(part)?);
        }
        Self::new(stages)
    }
}

fn parse_stage(part: &str) -> Result<Stage, ConfigError> {
    let mut kv = part.split('@');
    let (Some(secs), Some(rate), None) = (kv.next(), kv.next(), kv.next()) else {
        return Err(ConfigError::BadStage(part.to_string()));
    };

    let secs = secs.trim();
    let secs = match secs.parse::<i64>() {
        Ok(v) if v > 0 && v as u64 <= MAX_SCHEDULE.as_secs() => v as u64,
        _ => return Err(ConfigError::BadSeconds(secs.to_string())),
    };

    let rate = rate.trim();
    let rate = match rate.parse::<i64>() {
        Ok(v) if v >= 0 => u32::try_from(v).map_err(|_| ConfigError::BadRate(rate.to_string()))?,
        _ => return Err(ConfigError::BadRate(rate.to_string())),
    };

    Ok(Stage::new(Duration::from_secs(secs), rate))
}

impl fmt::Display for RampSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for stage in &self.stages {
            if !first {
                write!(f, ",")?;
            }
            first = false;
            write!(f, "{}@{}", stage.duration.as_secs(), stage.rate)?;
        }
        Ok(())
    }
}
