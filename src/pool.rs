use std::io;
use std::ops::{Deref, DerefMut};

use async_trait::async_trait;
use futures::TryStreamExt;
use http::{HeaderMap, Method};
use tracing::debug;

use crate::body::Body;
use crate::context::Context;
use crate::error::ProxyError;
use crate::response::RawResponse;

/// Request descriptor handed to a pooled client for one forwarded call.
///
/// The body is assigned verbatim from the inbound request; the pool performs
/// no transformation or validation of it.
#[derive(Debug)]
pub struct ForwardRequest {
    pub method: Method,
    pub path: String,
    pub body: Body,
}

/// Source of per-call transport clients.
///
/// `acquire` and `release` must be safe for concurrent use. Each handle is
/// single-use: acquired before the forwarded call, mutated only for that
/// call, released exactly once afterwards.
#[async_trait]
pub trait ClientPool: Send + Sync {
    /// Produce a client scoped to one call.
    ///
    /// # Errors
    /// Returns `ProxyError::Acquire` when no client can be produced.
    async fn acquire(&self) -> Result<Box<dyn PooledClient>, ProxyError>;

    /// Return a client to the pool. Synchronous so it can run from `Drop`.
    fn release(&self, client: Box<dyn PooledClient>);
}

/// A single-use transport client bound to one forwarded call.
#[async_trait]
pub trait PooledClient: Send {
    /// Attach the credential token; an empty token clears the credential
    fn set_token(&mut self, token: &str);

    /// Attach the inbound request's header collection
    fn set_headers(&mut self, headers: HeaderMap);

    /// Start a request descriptor for the given method and path
    fn new_request(&self, method: Method, path: &str) -> ForwardRequest;

    /// Issue the forwarded request under the caller's context.
    ///
    /// # Errors
    /// Cancellation and deadline expiry surface as
    /// `ProxyError::Cancelled` / `ProxyError::DeadlineExceeded`; transport
    /// failures keep their original cause.
    async fn issue(&self, ctx: &Context, req: ForwardRequest)
    -> Result<RawResponse, ProxyError>;
}

/// Scoped handle that returns its client to the pool on drop.
///
/// Acquire up front, exit through `Drop`: release happens exactly once on
/// every path out of a call, early returns and panics included.
pub struct PooledClientGuard<'a> {
    pool: &'a dyn ClientPool,
    client: Option<Box<dyn PooledClient>>,
}

impl<'a> PooledClientGuard<'a> {
    pub async fn acquire(pool: &'a dyn ClientPool) -> Result<PooledClientGuard<'a>, ProxyError> {
        let client = pool.acquire().await?;
        Ok(Self {
            pool,
            client: Some(client),
        })
    }
}

impl Deref for PooledClientGuard<'_> {
    type Target = dyn PooledClient;

    fn deref(&self) -> &Self::Target {
        // Invariant: the client is only taken in Drop.
        self.client.as_deref().expect("client released before drop")
    }
}

impl DerefMut for PooledClientGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.client
            .as_deref_mut()
            .expect("client released before drop")
    }
}

impl Drop for PooledClientGuard<'_> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.release(client);
        }
    }
}

/// `ClientPool` over a shared `reqwest::Client` and a fixed base URL.
///
/// Connection pooling lives inside the shared `reqwest::Client`; each
/// acquired `HttpClient` is a cheap per-call view that carries the call's
/// credential and headers without touching shared state.
pub struct HttpClientPool {
    base_url: String,
    http: reqwest::Client,
}

impl HttpClientPool {
    /// Create a pool targeting `base_url` with a default transport client
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProxyError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ProxyError::Configuration(e.to_string()))?;
        Ok(Self::with_client(base_url, http))
    }

    /// Create a pool over a caller-configured `reqwest::Client`
    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }
}

#[async_trait]
impl ClientPool for HttpClientPool {
    async fn acquire(&self) -> Result<Box<dyn PooledClient>, ProxyError> {
        Ok(Box::new(HttpClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: None,
            headers: HeaderMap::new(),
        }))
    }

    fn release(&self, client: Box<dyn PooledClient>) {
        // Dropping the per-call view returns its connections to the shared
        // reqwest pool.
        drop(client);
    }
}

/// Per-call client handed out by [`HttpClientPool`].
struct HttpClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    headers: HeaderMap,
}

#[async_trait]
impl PooledClient for HttpClient {
    fn set_token(&mut self, token: &str) {
        self.token = if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        };
    }

    fn set_headers(&mut self, headers: HeaderMap) {
        self.headers = headers;
    }

    fn new_request(&self, method: Method, path: &str) -> ForwardRequest {
        ForwardRequest {
            method,
            path: path.to_string(),
            body: Body::Empty,
        }
    }

    async fn issue(
        &self,
        ctx: &Context,
        req: ForwardRequest,
    ) -> Result<RawResponse, ProxyError> {
        let url = format!("{}{}", self.base_url, req.path);
        debug!(url = %url, method = %req.method, "issuing upstream request");

        let mut builder = self.http.request(req.method, &url);

        if let Some(token) = &self.token {
            builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }

        builder = match req.body {
            Body::Empty => builder,
            Body::Bytes(bytes) => builder.body(bytes),
            Body::Stream(_) => {
                return Err(ProxyError::InvalidRequest(
                    "streaming request bodies are not supported".into(),
                ));
            }
        };

        let resp = ctx.run(builder.send()).await?.map_err(|e| {
            if e.is_timeout() {
                ProxyError::DeadlineExceeded(e.to_string())
            } else if e.is_connect() {
                ProxyError::Connection(e.to_string())
            } else {
                ProxyError::Forward(e)
            }
        })?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let stream = resp.bytes_stream().map_err(io::Error::other);

        Ok(RawResponse::new(
            status,
            headers,
            Body::Stream(Box::pin(stream)),
        ))
    }
}
