// Engine Error Types
// Shared error taxonomy for the memory model, worker pool and resolver

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Index {index} out of bounds for length {len}")]
    Index { index: usize, len: usize },

    #[error("Dimension mismatch: {0}")]
    Dimension(String),

    #[error("Orientation mismatch: {0}")]
    Orientation(String),

    #[error("Matrix store is empty")]
    EmptyStore,

    #[error("{failed} of {total} task(s) failed; first failure: {first}")]
    TaskFailed {
        failed: usize,
        total: usize,
        first: String,
    },

    #[error("Worker {0} has been shut down")]
    WorkerShutDown(usize),

    #[error("Worker {0} already holds a pending task")]
    WorkerBusy(usize),

    #[error("Worker pool has been shut down")]
    PoolShutDown,

    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),
}

impl EngineError {
    pub fn dimension(message: impl Into<String>) -> Self {
        Self::Dimension(message.into())
    }

    pub fn orientation(message: impl Into<String>) -> Self {
        Self::Orientation(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Whether this error was raised while validating operands, before any work ran
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::MissingArgument(_)
                | Self::Index { .. }
                | Self::Dimension(_)
                | Self::Orientation(_)
                | Self::EmptyStore
        )
    }
}
