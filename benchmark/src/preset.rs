//! Default shape parameters per mode, overridable from the command line.
use std::num::NonZeroU32;
use std::time::Duration;
use volley::prelude::*;
use volley::ModeKind;

const DEFAULT_RAMP: &str = "30@1000,30@2000,30@4000";

#[derive(Debug)]
pub struct Preset {
    mode: ModeKind,
    workers: Option<usize>,
    rate: Option<NonZeroU32>,
    ramp: Option<RampSchedule>,
}

impl Preset {
    pub fn new(
        mode: ModeKind,
        workers: Option<usize>,
        rate: Option<NonZeroU32>,
        ramp: Option<RampSchedule>,
    ) -> Self {
        Self {
            mode,
            workers,
            rate,
            ramp,
        }
    }

    /// Shapes that open their own connections per worker.
    pub fn needs_connector(&self) -> bool {
        self.mode.reconnects() || self.mode == ModeKind::Warm
    }

    fn workers_or(&self, default: usize) -> usize {
        self.workers.unwrap_or(default)
    }

    fn rate_or(&self, default: u32) -> NonZeroU32 {
        self.rate
            .or(NonZeroU32::new(default))
            .unwrap_or(NonZeroU32::MIN)
    }

    pub fn apply<S, T>(&self, scenario: S, duration: Option<Duration>) -> S
    where
        S: ConfigurableScenario<T>,
        T: Send,
    {
        let ms = Duration::from_millis;
        let secs = Duration::from_secs;

        let scenario = match self.mode {
            ModeKind::Constant => scenario
                .workers(self.workers_or(64))
                .constant_rate(self.rate_or(1_000))
                .duration(secs(30)),
            ModeKind::Mixed => scenario
                .workers(self.workers_or(100))
                .constant_rate(self.rate_or(2_000))
                .duration(secs(120)),
            ModeKind::Burst => scenario.workers(self.workers_or(1_000)).burst(BurstCycle {
                cycles: 20,
                idle: secs(3),
                burst: secs(3),
                rate: self.rate_or(3_000),
            }),
            ModeKind::Ramp => {
                let scenario = scenario.workers(self.workers_or(1_000));
                match &self.ramp {
                    Some(schedule) => scenario.ramp(schedule.clone()),
                    None => scenario.ramp_str(DEFAULT_RAMP),
                }
            }
            ModeKind::Smooth => scenario.workers(self.workers_or(1_000)).smooth_ramp(
                SmoothRamp::new(secs(60), secs(120), secs(60), self.rate_or(15_000)),
            ),
            ModeKind::Periodic => scenario
                .workers(self.workers_or(1_000))
                .periodic(ms(200), ms(100))
                .duration(secs(120)),
            ModeKind::Churn => scenario
                .workers(self.workers_or(100))
                .phase_cycling(PhaseCycle::churn(20, 2, ms(500))),
            ModeKind::Cold => scenario
                .workers(self.workers_or(1))
                .phase_cycling(PhaseCycle::cold_start(100, ms(30))),
            ModeKind::Warm => scenario
                .workers(self.workers_or(1))
                .phase_cycling(PhaseCycle::warm(100, ms(30))),
            ModeKind::Migration => scenario
                .workers(self.workers_or(10))
                .phase_cycling(PhaseCycle::migration(10, 20, secs(1))),
            ModeKind::Parallel => scenario
                .workers(self.workers_or(1))
                .parallel_streams(ParallelStreams {
                    batches: 50,
                    streams: 20,
                    batch_interval: ms(30),
                }),
        };

        match duration {
            Some(duration) => scenario.duration(duration),
            None => scenario,
        }
    }
}
