mod config;
mod constants;
mod data;
mod error;
mod mix;
mod ramp;
mod report;
mod stats;

pub use config::*;
pub use constants::*;
pub use data::*;
pub use error::*;
pub use mix::*;
pub use ramp::*;
pub use report::*;
pub use stats::*;
