use std::io;

use thiserror::Error;

/// Errors surfaced by the forwarding stage.
///
/// Nothing is retried or recovered internally; every variant is reported to
/// the immediate caller with its original cause attached where one exists.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid proxy configuration: {0}")]
    Configuration(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("client acquisition failed: {0}")]
    Acquire(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("forward failed: {0}")]
    Forward(#[from] reqwest::Error),

    #[error("failed to read response body: {0}")]
    BodyRead(#[source] io::Error),
}

impl ProxyError {
    /// True for errors caused by the caller's context, not the upstream.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            ProxyError::Cancelled | ProxyError::DeadlineExceeded(_)
        )
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::InvalidRequest(err.to_string())
    }
}
