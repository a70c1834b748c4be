#![cfg_attr(docsrs, feature(doc_cfg))]
//! Volley drives synthetic request traffic through a pluggable [`RequestOp`] under a chosen
//! traffic shape and reports latency and throughput statistics.
//!
//! ```no_run
//! use volley::prelude::*;
//! use std::num::NonZeroU32;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), RunError> {
//!     let op = |_cx: RunContext, _id: u64| async {
//!         tokio::time::sleep(Duration::from_millis(1)).await;
//!         Ok::<usize, String>(512)
//!     };
//!
//!     let report = Scenario::from_op("baseline", op)
//!         .workers(4)
//!         .constant_rate(NonZeroU32::new(100).unwrap())
//!         .duration(Duration::from_secs(2))
//!         .await?;
//!
//!     println!("{}", report.summary);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod operation;
pub mod scenario;

pub(crate) mod collector;
pub(crate) mod counters;
pub(crate) mod dispatcher;
pub(crate) mod pacer;
pub(crate) mod progress;
pub(crate) mod recorder;
pub(crate) mod worker;

pub use error::RunError;
pub use operation::{Connector, RequestOp, RunContext, Shared, SharedOp};
pub use scenario::Scenario;
pub use tokio_util::sync::CancellationToken;
pub use volley_core::{
    BurstCycle, ConfigError, CounterTotals, DispatchStats, ModeKind, ParallelStreams,
    PayloadClass, PayloadMix, PhaseCycle, RampSchedule, Record, RunReport, SmoothRamp, Stage,
    Summary,
};

pub mod prelude {
    pub use crate::operation::{Connector, RequestOp, RunContext};
    pub use crate::scenario::{ConfigurableScenario, Scenario};
    pub use crate::RunError;
    pub use tokio_util::sync::CancellationToken;
    pub use volley_core::{
        BurstCycle, ParallelStreams, PhaseCycle, RampSchedule, RunReport, SmoothRamp, Summary,
    };
}
