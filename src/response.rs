use std::io;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::body::{Body, BoxStream};
use crate::error::ProxyError;

/// Raw response received from the backing service.
///
/// Status, headers, and transport-level fields are passed through unchanged.
/// After a successful [`Proxier::send`](crate::Proxier::send) the body is a
/// rewound in-memory view, so a downstream consumer can read it from the
/// start even though the transport stream was already drained.
pub struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl std::fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .finish()
    }
}

impl RawResponse {
    /// Create a new response from components
    pub fn new(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the response body
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Take the body out, leaving `Body::Empty` in its place
    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }

    /// Install a replacement body (the rewound view after capture)
    pub fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    /// Consume the response and return the entire body as bytes
    pub async fn bytes(self) -> Result<Bytes, ProxyError> {
        self.body.collect().await
    }

    /// Convert the response into a byte stream for streaming consumption
    pub fn into_stream(self) -> BoxStream<Result<Bytes, io::Error>> {
        self.body.into_stream()
    }
}

/// Result of one forwarded call.
///
/// `response_body` duplicates the captured body bytes so later stages can
/// inspect or cache the payload without consuming `response`'s body.
#[derive(Debug)]
pub struct SendResponse {
    /// The raw response with its body rewound for one full re-read
    pub response: RawResponse,
    /// Captured body bytes, `None` when the upstream sent no body
    pub response_body: Option<Bytes>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_take_body_leaves_empty() {
        let mut resp = RawResponse::new(
            StatusCode::OK,
            HeaderMap::new(),
            Body::from_bytes("payload"),
        );
        let body = resp.take_body();
        assert!(resp.body().is_empty());
        assert_eq!(&body.collect().await.unwrap()[..], b"payload");
    }

    #[tokio::test]
    async fn test_set_body_installs_rewound_view() {
        let mut resp = RawResponse::new(StatusCode::OK, HeaderMap::new(), Body::empty());
        resp.set_body(Body::from_bytes("OK"));
        assert_eq!(&resp.bytes().await.unwrap()[..], b"OK");
    }
}
