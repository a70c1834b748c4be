use thiserror::Error;

/// Invalid scenario configuration. Always raised before any task starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("bad stage: {0:?}")]
    BadStage(String),

    #[error("bad seconds: {0:?}")]
    BadSeconds(String),

    #[error("bad rps: {0:?}")]
    BadRate(String),

    #[error("no stages")]
    NoStages,

    #[error("unknown scenario mode: {0:?}")]
    UnknownMode(String),

    #[error("bad payload class: {0:?}")]
    BadMix(String),

    #[error("payload mix percentages sum to {0}, expected 100")]
    MixPercent(u64),

    #[error("scenario needs at least one worker")]
    NoWorkers,

    #[error("scenario has no workload; pick a rate, schedule or worker mode")]
    NoWorkload,

    #[error("{0} runs indefinitely; supply a duration")]
    Unbounded(&'static str),

    #[error("{0} capacity must be non-zero")]
    ZeroCapacity(&'static str),

    #[error("{0} must be non-zero")]
    Zero(&'static str),

    #[error("{0} exceeds the longest supported schedule")]
    TooLong(&'static str),
}
