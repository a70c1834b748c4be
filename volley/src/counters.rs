use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use volley_core::{CounterTotals, ERROR_LOG_EVERY_M, ERROR_LOG_FIRST_N};

/// Run-scoped request counters, shared by every worker and the progress reporter.
#[derive(Clone, Debug, Default)]
pub(crate) struct Counters {
    next_id: Arc<AtomicU64>,
    ok: Arc<AtomicU64>,
    err: Arc<AtomicU64>,
    err_logged: Arc<AtomicU64>,
    records_dropped: Arc<AtomicU64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn success(&self) {
        self.ok.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failure. Returns its ordinal when it should be logged.
    pub fn failure(&self) -> Option<u64> {
        let n = self.err.fetch_add(1, Ordering::Relaxed) + 1;
        if should_log(n) {
            self.err_logged.fetch_add(1, Ordering::Relaxed);
            Some(n)
        } else {
            None
        }
    }

    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// `(ok, err)`
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.ok.load(Ordering::Relaxed),
            self.err.load(Ordering::Relaxed),
        )
    }

    pub fn totals(&self) -> CounterTotals {
        let (ok, err) = self.snapshot();
        CounterTotals {
            ok,
            err,
            err_logged: self.err_logged.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
        }
    }
}

fn should_log(n: u64) -> bool {
    n <= ERROR_LOG_FIRST_N || n % ERROR_LOG_EVERY_M == 0
}
