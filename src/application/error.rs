use thiserror::Error;

use crate::application::repos::RepoError;
use crate::config::LoadError;
use crate::infra::error::InfraError;

/// Failure taxonomy for one reconciliation pass. No variant is fatal to
/// the process: the runner logs, the pass's drained events are dropped,
/// and the job retries on its next cadence.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("staging store unavailable: {0}")]
    StagingUnavailable(String),
    #[error("durable store unavailable: {0}")]
    DurableStoreUnavailable(#[source] RepoError),
    #[error("unexpected reconciliation failure: {0}")]
    Unexpected(String),
}

impl EngineError {
    /// Stable kind label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::StagingUnavailable(_) => "staging_unavailable",
            EngineError::DurableStoreUnavailable(_) => "durable_store_unavailable",
            EngineError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<RepoError> for EngineError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Persistence(_) | RepoError::Timeout => {
                EngineError::DurableStoreUnavailable(err)
            }
            other => EngineError::Unexpected(other.to_string()),
        }
    }
}

/// Top-level process error for the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("configuration error: {0}")]
    Config(#[from] LoadError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
