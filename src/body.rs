use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::Stream;
use serde::Serialize;

use crate::error::ProxyError;

pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Request/response body abstraction.
///
/// `Empty` models an absent body; `Stream` is a one-shot transport stream
/// that can be drained exactly once via [`Body::collect`].
pub enum Body {
    /// No body
    Empty,
    /// Buffered bytes, re-readable any number of times
    Bytes(Bytes),
    /// Consumable transport stream
    Stream(BoxStream<Result<Bytes, io::Error>>),
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => write!(f, "Body::Empty"),
            Body::Bytes(bytes) => f.debug_tuple("Body::Bytes").field(&bytes.len()).finish(),
            Body::Stream(_) => write!(f, "Body::Stream(..)"),
        }
    }
}

impl Body {
    /// Create an empty body
    pub fn empty() -> Self {
        Body::Empty
    }

    /// Create a body from bytes
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Body::Bytes(bytes.into())
    }

    /// Create a body from a JSON-serializable value
    pub fn from_json<T: Serialize>(value: &T) -> Result<Self, ProxyError> {
        let json = serde_json::to_vec(value)?;
        Ok(Body::Bytes(Bytes::from(json)))
    }

    /// Check if the body is absent
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Drain the body to completion and return the captured bytes.
    ///
    /// A `Stream` body is consumed by this call; re-reading requires
    /// installing a fresh `Body::Bytes` view over the returned bytes.
    ///
    /// # Errors
    /// Returns `ProxyError::BodyRead` if the underlying stream fails before
    /// yielding all of its content.
    pub async fn collect(self) -> Result<Bytes, ProxyError> {
        match self {
            Body::Empty => Ok(Bytes::new()),
            Body::Bytes(bytes) => Ok(bytes),
            Body::Stream(mut stream) => {
                let mut buf = Vec::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(ProxyError::BodyRead)?;
                    buf.extend_from_slice(&chunk);
                }
                Ok(Bytes::from(buf))
            }
        }
    }

    /// Convert the body into a byte stream for streaming consumption
    pub fn into_stream(self) -> BoxStream<Result<Bytes, io::Error>> {
        match self {
            Body::Empty => Box::pin(futures::stream::empty()),
            Body::Bytes(bytes) => Box::pin(futures::stream::once(async move { Ok(bytes) })),
            Body::Stream(stream) => stream,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Empty
    }
}

// Convenient From trait implementations
impl From<()> for Body {
    fn from(_: ()) -> Self {
        Body::Empty
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(Bytes::from(s))
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Bytes(Bytes::from(s.to_string()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}
