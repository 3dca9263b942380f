use thiserror::Error;

use crate::storage::StoreError;
use crate::transform::TransformError;

/// Why a stage, or the checks before the first stage, failed.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Precondition validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("Pipeline run was cancelled")]
    Cancelled
}

impl StageError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Only store connectivity and I/O failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            StageError::Store(error) => error.is_transient(),
            _ => false
        }
    }
}
