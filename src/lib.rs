//! Forwarding stage for layered request-processing pipelines.
//!
//! A [`ForwardingProxy`] accepts an already-parsed [`SendRequest`], forwards
//! it unmodified to the backing service through a per-call client from a
//! [`ClientPool`], and returns a [`SendResponse`] holding both the raw
//! response and a re-readable copy of its body. The transport body stream is
//! drained exactly once, captured, and replaced with a rewound in-memory
//! view so later stages can inspect or cache the payload without consuming
//! it.
//!
//! The stage is one [`Proxier`] among several: caching or retry stages wrap
//! another `Proxier` and delegate downward, with this one innermost. It
//! never retries, never rewrites the request beyond attaching the credential
//! and headers, and releases its pooled client on every exit path.
//!
//! # Examples
//!
//! ## Forwarding a request
//!
//! ```no_run
//! use std::sync::Arc;
//! use forwarding_proxy::{
//!     Context, ForwardingProxy, ForwardingProxyConfig, HttpClientPool, Method,
//!     Proxier, SendRequest,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = Arc::new(HttpClientPool::new("https://vault.internal:8200")?);
//! let proxy = ForwardingProxy::new(ForwardingProxyConfig {
//!     client_pool: Some(pool),
//! })?;
//!
//! let request = SendRequest::builder()
//!     .token("s.xyz")
//!     .method(Method::GET)
//!     .path("/v1/secret/foo")
//!     .build()?;
//!
//! let result = proxy.send(&Context::new(), request).await?;
//! if let Some(body) = &result.response_body {
//!     println!("captured {} bytes", body.len());
//! }
//! // The response body is rewound and still readable.
//! let replay = result.response.bytes().await?;
//! # let _ = replay;
//! # Ok(())
//! # }
//! ```
//!
//! ## Bounding a call with a deadline
//!
//! ```no_run
//! use std::time::Duration;
//! use forwarding_proxy::Context;
//!
//! let ctx = Context::new().with_deadline(Duration::from_secs(5));
//! let cancel = ctx.cancellation_token();
//! // Hand `cancel` to a shutdown handler; `ctx` to the send call.
//! # let _ = cancel;
//! ```

mod body;
mod context;
mod error;
mod pool;
mod proxy;
mod request;
mod response;

// Re-export public API
pub use body::{Body, BoxStream};
pub use context::Context;
pub use error::ProxyError;
pub use pool::{ClientPool, ForwardRequest, HttpClientPool, PooledClient, PooledClientGuard};
pub use proxy::{ForwardingProxy, ForwardingProxyConfig, Proxier};
pub use request::{SendRequest, SendRequestBuilder};
pub use response::{RawResponse, SendResponse};

// Re-export commonly used types from dependencies
pub use http::{Method, StatusCode};
