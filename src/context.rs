use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ProxyError;

/// Caller-supplied cancellation and deadline discipline for one call.
///
/// The stage imposes no deadline of its own: a default `Context` never
/// cancels and never times out. Callers opt in via [`Context::with_deadline`]
/// or by cancelling the token obtained from [`Context::cancellation_token`].
///
/// The deadline is absolute: it is fixed when `with_deadline` is called and
/// bounds everything run under the context afterwards, no matter how many
/// suspension points the call crosses.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the context to an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Bound all work under this context by `deadline` from now
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(Instant::now() + deadline);
        self
    }

    /// Token that cancels work running under this context
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drive `fut` under this context.
    ///
    /// Returns `ProxyError::Cancelled` if the token fires first and
    /// `ProxyError::DeadlineExceeded` if the deadline passes first; otherwise
    /// yields the future's own output.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ProxyError>
    where
        F: Future,
    {
        match self.deadline {
            Some(at) => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(ProxyError::Cancelled),
                res = tokio::time::timeout_at(at, fut) => {
                    res.map_err(|_| ProxyError::DeadlineExceeded("deadline elapsed".into()))
                }
            },
            None => tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(ProxyError::Cancelled),
                res = fut => Ok(res),
            },
        }
    }
}
