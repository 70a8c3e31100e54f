use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;

use crate::body::Body;
use crate::error::ProxyError;

/// Inbound request descriptor handed to a [`Proxier`](crate::Proxier).
///
/// Carries the credential token, the original method, path, headers, and the
/// raw body. Immutable once built; the forwarding stage passes the body
/// through byte-for-byte.
#[derive(Debug)]
pub struct SendRequest {
    token: String,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Body,
}

impl SendRequest {
    /// Create a new request builder
    pub fn builder() -> SendRequestBuilder {
        SendRequestBuilder::default()
    }

    /// Credential token attached to the per-call client (may be empty)
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Get the request path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the request headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the request body
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Decompose into the parts the forwarding stage needs
    pub(crate) fn into_parts(self) -> (String, Method, String, HeaderMap, Body) {
        (self.token, self.method, self.path, self.headers, self.body)
    }
}

/// Builder for constructing requests with a fluent API
#[derive(Debug, Default)]
pub struct SendRequestBuilder {
    token: String,
    method: Option<Method>,
    path: Option<String>,
    headers: HeaderMap,
    body: Body,
}

impl SendRequestBuilder {
    /// Set the credential token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Set the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the request path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add a header
    pub fn header<K, V>(mut self, key: K, value: V) -> Result<Self, ProxyError>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
        K::Error: std::fmt::Display,
        V::Error: std::fmt::Display,
    {
        let key = key
            .try_into()
            .map_err(|e| ProxyError::InvalidRequest(format!("Invalid header name: {}", e)))?;
        let value = value
            .try_into()
            .map_err(|e| ProxyError::InvalidRequest(format!("Invalid header value: {}", e)))?;
        self.headers.append(key, value);
        Ok(self)
    }

    /// Set the body to a JSON-serialized value and add Content-Type header
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, ProxyError> {
        self.body = Body::from_json(value)?;
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }

    /// Set the request body
    pub fn body<B: Into<Body>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Build the request
    pub fn build(self) -> Result<SendRequest, ProxyError> {
        let method = self.method.unwrap_or(Method::GET);
        let path = self
            .path
            .ok_or_else(|| ProxyError::InvalidRequest("Request path is required".into()))?;

        Ok(SendRequest {
            token: self.token,
            method,
            path,
            headers: self.headers,
            body: self.body,
        })
    }
}
