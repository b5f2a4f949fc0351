//! Typed errors for the places callers need to match on a failure.
//!
//! Everything else flows through `anyhow::Result` with context.

use thiserror::Error;

/// Lifecycle misuse of [`crate::pipeline::EventPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("translation pipeline is already running")]
    AlreadyRunning,
    #[error("translation pipeline is not running")]
    NotRunning,
}

/// Failures reported by a translation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("translation provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("translation provider response contained no choices")]
    NoChoices,
    #[error("translation provider reply is not a translation object: {0}")]
    MalformedReply(String),
}

impl ProviderError {
    /// 429 and 5xx are worth another attempt; other client errors and bad replies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            ProviderError::NoChoices | ProviderError::MalformedReply(_) => false,
        }
    }
}
