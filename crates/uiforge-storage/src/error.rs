// Storage errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Thread {0} not found")]
    ThreadNotFound(String),

    #[error("A run is already in progress for thread {0}")]
    RunInProgress(String),
}
