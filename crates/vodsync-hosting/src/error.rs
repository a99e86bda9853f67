//! Hosting adapter error types.

use thiserror::Error;

pub type HostingResult<T> = Result<T, HostingError>;

/// Failures talking to an external collaborator.
///
/// Communication failures and malformed responses carry distinct,
/// self-describing messages; orchestrators record them on the failed
/// job verbatim so the failure class stays visible in job records.
#[derive(Debug, Error)]
pub enum HostingError {
    #[error("transcoder request failed: {0}")]
    TranscoderUnreachable(#[source] reqwest::Error),

    #[error("transcoder returned malformed response: {0}")]
    TranscoderBadResponse(String),

    #[error("transcoder rejected submission: {0}")]
    TranscoderRejected(String),

    #[error("video host request failed: {0}")]
    HostUnreachable(#[source] reqwest::Error),

    #[error("video host rejected visibility update: {0}")]
    HostRejected(String),
}

impl HostingError {
    pub fn bad_response(msg: impl Into<String>) -> Self {
        Self::TranscoderBadResponse(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::TranscoderRejected(msg.into())
    }

    pub fn host_rejected(msg: impl Into<String>) -> Self {
        Self::HostRejected(msg.into())
    }
}
