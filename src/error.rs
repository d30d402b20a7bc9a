// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Stage-level failures. Individual item rejections are not errors; they are
/// logged and dropped by the validator. A day with no polar labels is not an
/// error either, it yields a zero-score `DailySentiment`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("worker count must be at least 1 (got {0})")]
    InvalidWorkerCount(usize),

    #[error("malformed batch: {0}")]
    MalformedBatch(String),

    #[error("classification service unavailable ({profile}): {reason}")]
    ServiceUnavailable { profile: String, reason: String },

    #[error("feed source unavailable: {0}")]
    FeedUnavailable(String),

    #[error("document store error: {0}")]
    Store(String),
}

impl PipelineError {
    pub fn unavailable(profile: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::ServiceUnavailable {
            profile: profile.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a collaborator error from the document store, keeping the context chain.
    pub fn store(err: anyhow::Error) -> Self {
        PipelineError::Store(format!("{err:#}"))
    }
}
