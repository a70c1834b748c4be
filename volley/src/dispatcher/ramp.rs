use super::{extend, Dispatcher};
use std::num::NonZeroU32;
use std::ops::ControlFlow;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::RampSchedule;

/// Walk the stages in order. Rate-zero stages are idle.
pub(super) async fn run(dispatcher: &mut Dispatcher, schedule: &RampSchedule) -> ControlFlow<()> {
    let stages = schedule.stages();
    let mut deadline = Instant::now();
    for (i, stage) in stages.iter().enumerate() {
        let ControlFlow::Continue(next) = extend(deadline, stage.duration) else {
            return ControlFlow::Break(());
        };
        deadline = next;
        let flow = match NonZeroU32::new(stage.rate) {
            Some(rate) => {
                info!(
                    "Stage {}/{}: {rate} rps for {}",
                    i + 1,
                    stages.len(),
                    humantime::format_duration(stage.duration)
                );
                dispatcher.emit(rate, Some(deadline), None).await
            }
            None => {
                info!(
                    "Stage {}/{}: idle for {}",
                    i + 1,
                    stages.len(),
                    humantime::format_duration(stage.duration)
                );
                dispatcher.idle(deadline).await
            }
        };
        if flow.is_break() {
            return flow;
        }
    }
    ControlFlow::Continue(())
}
