//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid batch request: {0}")]
    InvalidBatch(String),

    #[error("Store error: {0}")]
    Store(#[from] vodsync_store::StoreError),

    #[error("Hosting error: {0}")]
    Hosting(#[from] vodsync_hosting::HostingError),
}

impl PipelineError {
    pub fn invalid_batch(msg: impl Into<String>) -> Self {
        Self::InvalidBatch(msg.into())
    }
}
