use super::Dispatcher;
use crate::pacer::Pacer;
use std::ops::ControlFlow;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::{SmoothRamp, SMOOTH_TICK};

/// Follow the ramp-up / sustain / ramp-down profile.
///
/// Ticks at a fixed granularity and accrues fractional token credit from the interpolated rate,
/// so rates above the tick frequency still produce the right number of tokens.
pub(super) async fn run(dispatcher: &mut Dispatcher, profile: SmoothRamp) -> ControlFlow<()> {
    let cancel = dispatcher.cancel.clone();
    let mut pacer = Pacer::new(SMOOTH_TICK);
    let start = tokio::time::Instant::now();
    let mut last = start;
    let mut credit = 0.;
    let mut phase = Phase::Up;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return ControlFlow::Break(()),
            now = pacer.tick() => {
                let elapsed = now - start;
                let Some(rate) = profile.rate_at(elapsed) else {
                    return ControlFlow::Continue(());
                };

                let current = Phase::at(&profile, elapsed);
                if current != phase {
                    info!("{current:?} at {rate:.0} rps after {}", humantime::format_duration(elapsed));
                    phase = current;
                }

                credit += rate * (now - last).as_secs_f64();
                last = now;
                while credit >= 1. {
                    dispatcher.offer();
                    credit -= 1.;
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Up,
    Sustain,
    Down,
}

impl Phase {
    fn at(profile: &SmoothRamp, elapsed: std::time::Duration) -> Self {
        if elapsed < profile.ramp_up {
            Phase::Up
        } else if elapsed < profile.ramp_up.saturating_add(profile.sustain) {
            Phase::Sustain
        } else {
            Phase::Down
        }
    }
}
