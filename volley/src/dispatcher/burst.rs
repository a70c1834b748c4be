use super::{extend, Dispatcher};
use std::ops::ControlFlow;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::BurstCycle;

/// Per cycle: stay silent for `idle`, then emit at `rate` for `burst`.
pub(super) async fn run(dispatcher: &mut Dispatcher, config: BurstCycle) -> ControlFlow<()> {
    let mut deadline = Instant::now();
    for cycle in 1..=config.cycles {
        debug!(
            "Cycle {cycle}/{}: idle for {}",
            config.cycles,
            humantime::format_duration(config.idle)
        );
        let ControlFlow::Continue(next) = extend(deadline, config.idle) else {
            return ControlFlow::Break(());
        };
        deadline = next;
        if dispatcher.idle(deadline).await.is_break() {
            return ControlFlow::Break(());
        }

        info!(
            "Cycle {cycle}/{}: burst at {} rps for {}",
            config.cycles,
            config.rate,
            humantime::format_duration(config.burst)
        );
        let ControlFlow::Continue(next) = extend(deadline, config.burst) else {
            return ControlFlow::Break(());
        };
        deadline = next;
        if dispatcher
            .emit(config.rate, Some(deadline), None)
            .await
            .is_break()
        {
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}
