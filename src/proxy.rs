use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::body::Body;
use crate::context::Context;
use crate::error::ProxyError;
use crate::pool::{ClientPool, PooledClientGuard};
use crate::request::SendRequest;
use crate::response::SendResponse;

/// Capability of forwarding a [`SendRequest`] and producing a
/// [`SendResponse`].
///
/// Stages in a pipeline compose by decoration: a caching or retry stage
/// wraps another `Proxier` and delegates to it. This crate ships the
/// innermost one, [`ForwardingProxy`].
#[async_trait]
pub trait Proxier: Send + Sync {
    async fn send(&self, ctx: &Context, req: SendRequest) -> Result<SendResponse, ProxyError>;
}

/// Configuration for [`ForwardingProxy`].
pub struct ForwardingProxyConfig {
    /// Source of per-call transport clients. Mandatory.
    pub client_pool: Option<Arc<dyn ClientPool>>,
}

/// `Proxier` that forwards requests unmodified to the backing service,
/// attaching only the credential token and headers, and hands back the raw
/// response with its body captured and rewound for downstream stages.
pub struct ForwardingProxy {
    pool: Arc<dyn ClientPool>,
}

impl std::fmt::Debug for ForwardingProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardingProxy").finish_non_exhaustive()
    }
}

impl ForwardingProxy {
    /// Build the proxy from its configuration.
    ///
    /// # Errors
    /// Returns `ProxyError::Configuration` when the client pool is absent.
    pub fn new(config: ForwardingProxyConfig) -> Result<Self, ProxyError> {
        let pool = config
            .client_pool
            .ok_or_else(|| ProxyError::Configuration("client pool is required".into()))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Proxier for ForwardingProxy {
    async fn send(&self, ctx: &Context, req: SendRequest) -> Result<SendResponse, ProxyError> {
        let (token, method, path, headers, body) = req.into_parts();

        // The guard returns the client to the pool on every exit path from
        // here on, including panics.
        let mut client = PooledClientGuard::acquire(self.pool.as_ref()).await?;
        client.set_token(&token);
        client.set_headers(headers);

        let mut fw_req = client.new_request(method.clone(), &path);
        fw_req.body = body;

        info!(method = %method, path = %path, "forwarding request");
        let mut response = client.issue(ctx, fw_req).await?;

        let response_body = match response.take_body() {
            Body::Empty => None,
            body => {
                let captured = match ctx.run(body.collect()).await.and_then(|r| r) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        // Caller-driven cancellation is not a stream failure.
                        if !e.is_cancellation() {
                            error!(error = %e, "failed to read response body");
                        }
                        return Err(e);
                    }
                };
                // Install a fresh in-memory view so the next stage can read
                // the body from the start; the transport stream is gone.
                response.set_body(Body::from_bytes(captured.clone()));
                Some(captured)
            }
        };

        Ok(SendResponse {
            response,
            response_body,
        })
    }
}
