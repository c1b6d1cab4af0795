// Run errors

use thiserror::Error;
use uiforge_core::GeneratorError;
use uiforge_storage::StoreError;

pub type Result<T> = std::result::Result<T, RunError>;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Assistant {0} not found")]
    AssistantNotFound(String),

    #[error("A run is already in progress for thread {0}")]
    RunInProgress(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Generator(#[from] GeneratorError),
}

impl From<StoreError> for RunError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::RunInProgress(thread_id) => RunError::RunInProgress(thread_id),
            other => RunError::Store(other),
        }
    }
}

impl RunError {
    pub fn invalid_input(error: impl std::fmt::Display) -> Self {
        RunError::InvalidInput(error.to_string())
    }
}
