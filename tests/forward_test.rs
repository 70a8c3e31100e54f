use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use httpmock::prelude::*;
use forwarding_proxy::{
    ClientPool, Context, ForwardingProxy, ForwardingProxyConfig, HttpClientPool, Method,
    PooledClient, ProxyError, Proxier, SendRequest, StatusCode,
};

/// Helper to build a proxy over a mock upstream
fn proxy_for(server: &MockServer) -> ForwardingProxy {
    let pool = Arc::new(HttpClientPool::new(server.base_url()).unwrap());
    ForwardingProxy::new(ForwardingProxyConfig {
        client_pool: Some(pool),
    })
    .unwrap()
}

/// Pool decorator that counts acquire/release round-trips
struct CountingPool {
    inner: Arc<dyn ClientPool>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl CountingPool {
    fn over(inner: Arc<dyn ClientPool>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ClientPool for CountingPool {
    async fn acquire(&self) -> Result<Box<dyn PooledClient>, ProxyError> {
        let client = self.inner.acquire().await?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(client)
    }

    fn release(&self, client: Box<dyn PooledClient>) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.inner.release(client);
    }
}

#[tokio::test]
async fn test_forward_get_with_token() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/secret/foo")
            .header("authorization", "Bearer t1");
        then.status(200).body("OK");
    });

    let proxy = proxy_for(&server);
    let request = SendRequest::builder()
        .token("t1")
        .method(Method::GET)
        .path("/v1/secret/foo")
        .build()
        .unwrap();

    let result = proxy.send(&Context::new(), request).await.unwrap();

    assert_eq!(result.response.status(), StatusCode::OK);
    assert_eq!(result.response_body.as_deref(), Some(&b"OK"[..]));
    // The body was drained from the wire yet reads again from the start.
    assert_eq!(&result.response.bytes().await.unwrap()[..], b"OK");

    mock.assert();
}

#[tokio::test]
async fn test_forward_post_body_byte_for_byte() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/kv/data/app")
            .body("{\"data\":{\"password\":\"hunter2\"}}");
        then.status(204);
    });

    let proxy = proxy_for(&server);
    let request = SendRequest::builder()
        .token("t1")
        .method(Method::POST)
        .path("/v1/kv/data/app")
        .body("{\"data\":{\"password\":\"hunter2\"}}")
        .build()
        .unwrap();

    let result = proxy.send(&Context::new(), request).await.unwrap();

    assert_eq!(result.response.status(), StatusCode::NO_CONTENT);
    mock.assert();
}

#[tokio::test]
async fn test_forward_passes_headers_through() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/sys/health")
            .header("x-request-id", "req-42")
            .header("x-namespace", "tenant-a");
        then.status(200).body("{}");
    });

    let proxy = proxy_for(&server);
    let request = SendRequest::builder()
        .method(Method::GET)
        .path("/v1/sys/health")
        .header("x-request-id", "req-42")
        .unwrap()
        .header("x-namespace", "tenant-a")
        .unwrap()
        .build()
        .unwrap();

    proxy.send(&Context::new(), request).await.unwrap();

    mock.assert();
}

#[tokio::test]
async fn test_forward_is_transparent_to_error_statuses() {
    let server = MockServer::start();

    let mock = server.mock(|when, then| {
        when.method(GET).path("/v1/secret/missing");
        then.status(404).body("{\"errors\":[]}");
    });

    let proxy = proxy_for(&server);
    let request = SendRequest::builder()
        .method(Method::GET)
        .path("/v1/secret/missing")
        .build()
        .unwrap();

    // Upstream status judgment belongs to later stages; this one forwards.
    let result = proxy.send(&Context::new(), request).await.unwrap();

    assert_eq!(result.response.status(), StatusCode::NOT_FOUND);
    assert_eq!(result.response_body.as_deref(), Some(&b"{\"errors\":[]}"[..]));
    mock.assert();
}

#[tokio::test]
async fn test_forward_releases_client_on_success_and_failure() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/v1/secret/foo");
        then.status(200).body("OK");
    });

    let pool = CountingPool::over(Arc::new(HttpClientPool::new(server.base_url()).unwrap()));
    let proxy = ForwardingProxy::new(ForwardingProxyConfig {
        client_pool: Some(pool.clone()),
    })
    .unwrap();

    let ok_req = SendRequest::builder().path("/v1/secret/foo").build().unwrap();
    proxy.send(&Context::new(), ok_req).await.unwrap();

    // Second pool pointed at a dead address: transport failure path.
    let dead = CountingPool::over(Arc::new(HttpClientPool::new("http://127.0.0.1:1").unwrap()));
    let dead_proxy = ForwardingProxy::new(ForwardingProxyConfig {
        client_pool: Some(dead.clone()),
    })
    .unwrap();
    let err_req = SendRequest::builder().path("/v1/secret/foo").build().unwrap();
    let err = dead_proxy.send(&Context::new(), err_req).await.unwrap_err();

    assert!(matches!(
        err,
        ProxyError::Connection(_) | ProxyError::Forward(_)
    ));
    assert_eq!(pool.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(pool.released.load(Ordering::SeqCst), 1);
    assert_eq!(dead.acquired.load(Ordering::SeqCst), 1);
    assert_eq!(dead.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_forward_deadline_expiry() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/v1/slow");
        then.status(200).body("late").delay(Duration::from_secs(5));
    });

    let proxy = proxy_for(&server);
    let ctx = Context::new().with_deadline(Duration::from_millis(50));
    let request = SendRequest::builder().path("/v1/slow").build().unwrap();

    let err = proxy.send(&ctx, request).await.unwrap_err();

    assert!(matches!(err, ProxyError::DeadlineExceeded(_)));
    assert!(err.is_cancellation());
}

#[tokio::test]
async fn test_forward_cancellation_mid_call() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(GET).path("/v1/slow");
        then.status(200).body("late").delay(Duration::from_secs(5));
    });

    let pool = CountingPool::over(Arc::new(HttpClientPool::new(server.base_url()).unwrap()));
    let proxy = ForwardingProxy::new(ForwardingProxyConfig {
        client_pool: Some(pool.clone()),
    })
    .unwrap();

    let ctx = Context::new();
    let token = ctx.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let request = SendRequest::builder().path("/v1/slow").build().unwrap();
    let err = tokio::time::timeout(Duration::from_secs(2), proxy.send(&ctx, request))
        .await
        .expect("cancellation must be observed promptly")
        .unwrap_err();

    assert!(matches!(err, ProxyError::Cancelled));
    assert_eq!(pool.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_forward_empty_upstream_body_round_trips_empty() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(DELETE).path("/v1/secret/foo");
        then.status(204);
    });

    let proxy = proxy_for(&server);
    let request = SendRequest::builder()
        .method(Method::DELETE)
        .path("/v1/secret/foo")
        .build()
        .unwrap();

    let result = proxy.send(&Context::new(), request).await.unwrap();

    // The HTTP transport always hands back a (possibly empty) stream, so the
    // capture exists and is empty; re-reading yields no bytes either.
    assert_eq!(result.response.status(), StatusCode::NO_CONTENT);
    assert_eq!(result.response_body.as_deref(), Some(&b""[..]));
    assert!(result.response.bytes().await.unwrap().is_empty());
}
