//! Worker pool modes.
//!
//! Every mode drives the same timing primitive, [`Recorder::perform`]. Waits between requests
//! observe the run's cancellation token; a request already in flight is left to finish.
//!
//! [`Recorder::perform`]: crate::recorder::Recorder::perform
pub(crate) mod parallel;
pub(crate) mod periodic;
pub(crate) mod phase;
pub(crate) mod token;

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sleep for `dur` unless the run is cancelled first. Returns `false` on cancellation.
pub(crate) async fn pause(cancel: &CancellationToken, dur: Duration) -> bool {
    if dur.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(dur) => true,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn pause_sleeps() {
        let start = Instant::now();
        assert!(pause(&CancellationToken::new(), Duration::from_millis(30)).await);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_observes_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!pause(&cancel, Duration::from_secs(3600)).await);
        assert!(!pause(&cancel, Duration::ZERO).await);
    }
}
