use crate::{Record, Summary};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Final request counter values for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CounterTotals {
    pub ok: u64,
    pub err: u64,
    /// Failures that made it past the log throttle.
    pub err_logged: u64,
    /// Records lost because the collector buffer was full.
    pub records_dropped: u64,
}

impl CounterTotals {
    pub fn requests(&self) -> u64 {
        self.ok + self.err
    }
}

/// What a dispatcher did with its tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DispatchStats {
    pub offered: u64,
    pub enqueued: u64,
    /// Tokens discarded because the queue was full.
    pub dropped: u64,
}

impl fmt::Display for DispatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "offered={} enqueued={} dropped={}",
            self.offered, self.enqueued, self.dropped
        )
    }
}

/// Everything a completed run hands to external reporting.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunReport {
    pub name: String,
    pub records: Vec<Record>,
    pub summary: Summary,
    pub totals: CounterTotals,
    /// `None` for worker modes without a dispatcher.
    pub dispatch: Option<DispatchStats>,
    pub elapsed: Duration,
    /// The run was stopped by its duration or an external cancellation rather than finishing
    /// its traffic shape.
    pub interrupted: bool,
}
