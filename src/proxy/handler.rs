//! Reverse proxy handler.
//!
//! # Responsibilities
//! - Rewrite the incoming target onto the upstream scheme and authority
//! - Forward end-to-end request headers and stream the body
//! - Relay upstream status, end-to-end headers and body back unchanged
//!
//! # Design Decisions
//! - Hop-by-hop headers are dropped in both directions
//! - `Host` is left to the client so it names the upstream
//! - Path and query are passed through byte for byte

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{
        request::Parts,
        uri::{Authority, Scheme},
        Request, Response, Uri,
    },
};
use url::Url;

use crate::dispatch::error::DispatchResult;
use crate::http::headers::copy_end_to_end;
use crate::observability::metrics;
use crate::proxy::client::{HyperUpstreamClient, UpstreamClient, UpstreamError};

/// Default deadline for one upstream exchange.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

/// Where proxied requests go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    scheme: Scheme,
    authority: Authority,
}

impl Upstream {
    /// Parse an upstream base such as `http://127.0.0.1:8080`.
    ///
    /// Any path on the base is ignored; the request path is used verbatim.
    /// Only plain `http` is accepted: the upstream client has no TLS connector.
    pub fn parse(address: &str) -> Result<Self, UpstreamError> {
        let url = Url::parse(address)
            .map_err(|e| UpstreamError::InvalidAddress(format!("{address}: {e}")))?;

        let scheme = match url.scheme() {
            "http" => Scheme::HTTP,
            other => {
                return Err(UpstreamError::InvalidAddress(format!(
                    "{address}: unsupported scheme {other}"
                )))
            }
        };
        let host = url
            .host_str()
            .ok_or_else(|| UpstreamError::InvalidAddress(format!("{address}: missing host")))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority)
            .map_err(|e| UpstreamError::InvalidAddress(format!("{address}: {e}")))?;

        Ok(Self { scheme, authority })
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    fn uri_for(&self, incoming: &Uri) -> Result<Uri, UpstreamError> {
        let path_and_query = incoming
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        Ok(Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?)
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme, self.authority)
    }
}

/// Forwards every request to one upstream.
#[derive(Clone)]
pub struct ProxyHandler {
    upstream: Upstream,
    client: Arc<dyn UpstreamClient>,
    timeout: Duration,
}

impl ProxyHandler {
    pub fn new(upstream: Upstream) -> Self {
        Self {
            upstream,
            client: Arc::new(HyperUpstreamClient::new()),
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Swap the transport, e.g. for a pooled client shared elsewhere.
    pub fn with_client(mut self, client: Arc<dyn UpstreamClient>) -> Self {
        self.client = client;
        self
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the upstream request from the incoming head and body.
    pub fn upstream_request(
        &self,
        head: &Parts,
        body: Body,
    ) -> Result<Request<Body>, UpstreamError> {
        let uri = self.upstream.uri_for(&head.uri)?;
        let mut request = Request::builder()
            .method(head.method.clone())
            .uri(uri)
            .body(body)?;
        copy_end_to_end(&head.headers, request.headers_mut());
        Ok(request)
    }

    /// Forward one exchange and relay the upstream answer.
    pub async fn forward(&self, head: &Parts, body: Body) -> DispatchResult<Response<Body>> {
        let request = self.upstream_request(head, body)?;
        tracing::debug!(
            method = %request.method(),
            target = %request.uri(),
            "Forwarding to upstream"
        );

        let upstream = match self.client.send(request, self.timeout).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(upstream = %self.upstream, error = %e, "Upstream error");
                metrics::record_upstream_error(e.kind());
                return Err(e.into());
            }
        };

        Ok(relay(upstream))
    }
}

/// Copy status, end-to-end headers and the streaming body.
fn relay(upstream: Response<Body>) -> Response<Body> {
    let (parts, body) = upstream.into_parts();
    let mut response = Response::new(body);
    *response.status_mut() = parts.status;
    copy_end_to_end(&parts.headers, response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::{header, Method, StatusCode};
    use std::sync::Mutex;

    /// Captures the forwarded request and answers with a canned response.
    struct Canned {
        seen: Mutex<Option<(Method, Uri, axum::http::HeaderMap, Vec<u8>)>>,
        status: StatusCode,
    }

    impl Canned {
        fn new(status: StatusCode) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(None),
                status,
            })
        }
    }

    #[async_trait]
    impl UpstreamClient for Canned {
        async fn send(
            &self,
            request: Request<Body>,
            _timeout: Duration,
        ) -> Result<Response<Body>, UpstreamError> {
            let (parts, body) = request.into_parts();
            let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
            let seen = (parts.method, parts.uri, parts.headers, bytes.to_vec());
            *self.seen.lock().unwrap() = Some(seen);

            Ok(Response::builder()
                .status(self.status)
                .header("x-a", "1")
                .header(header::CONNECTION, "close")
                .body(Body::from("Not here"))
                .unwrap())
        }
    }

    struct Slow;

    #[async_trait]
    impl UpstreamClient for Slow {
        async fn send(
            &self,
            _request: Request<Body>,
            timeout: Duration,
        ) -> Result<Response<Body>, UpstreamError> {
            Err(UpstreamError::Timeout(timeout))
        }
    }

    fn head(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_parse_upstream() {
        let upstream = Upstream::parse("http://127.0.0.1:8080/ignored").unwrap();
        assert_eq!(upstream.to_string(), "http://127.0.0.1:8080");
        assert!(Upstream::parse("ftp://example.com").is_err());
        assert!(Upstream::parse("not a url").is_err());
    }

    #[test]
    fn test_https_upstream_rejected() {
        let err = Upstream::parse("https://127.0.0.1:1").unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidAddress(_)));
        assert!(err.to_string().contains("unsupported scheme https"));
    }

    #[tokio::test]
    async fn test_forward_rewrites_target_and_strips_hop_headers() {
        let client = Canned::new(StatusCode::OK);
        let proxy = ProxyHandler::new(Upstream::parse("http://u:9000").unwrap())
            .with_client(client.clone());

        let incoming = head(
            Request::builder()
                .method(Method::POST)
                .uri("http://front/api/items?x=1")
                .header(header::HOST, "front")
                .header(header::CONTENT_LENGTH, "3")
                .header("x-trace", "abc")
                .header(header::TE, "trailers")
                .body(())
                .unwrap(),
        );

        proxy.forward(&incoming, Body::from("abc")).await.unwrap();

        let (method, uri, headers, body) = client.seen.lock().unwrap().take().unwrap();
        assert_eq!(method, Method::POST);
        assert_eq!(uri.to_string(), "http://u:9000/api/items?x=1");
        assert_eq!(headers.get("x-trace").unwrap(), "abc");
        assert!(headers.get(header::HOST).is_none());
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
        assert!(headers.get(header::TE).is_none());
        assert_eq!(body, b"abc");
    }

    #[tokio::test]
    async fn test_relay_keeps_status_and_drops_connection() {
        let proxy = ProxyHandler::new(Upstream::parse("http://u").unwrap())
            .with_client(Canned::new(StatusCode::NOT_FOUND));
        let incoming = head(Request::builder().uri("/missing").body(()).unwrap());

        let response = proxy.forward(&incoming, Body::empty()).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("x-a").unwrap(), "1");
        assert!(response.headers().get(header::CONNECTION).is_none());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Not here");
    }

    #[tokio::test]
    async fn test_timeout_maps_to_gateway_timeout() {
        let proxy = ProxyHandler::new(Upstream::parse("http://u").unwrap())
            .with_client(Arc::new(Slow))
            .with_timeout(Duration::from_millis(5));
        let incoming = head(Request::builder().uri("/").body(()).unwrap());

        let err = proxy.forward(&incoming, Body::empty()).await.unwrap_err();
        let envelope = err.protocol().unwrap();
        assert_eq!(envelope.status, StatusCode::GATEWAY_TIMEOUT);
    }
}
