use std::sync::PoisonError;
use thiserror::Error;
use tokio::task::JoinError;
use volley_core::ConfigError;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid scenario configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to establish the shared connection: {0}")]
    Connect(String),

    #[error("Record log Mutex is poisoned")]
    PoisonData,

    #[error("Engine task failed: {0}")]
    Task(#[from] JoinError),
}

impl<T> From<PoisonError<T>> for RunError {
    fn from(_err: PoisonError<T>) -> Self {
        Self::PoisonData
    }
}
