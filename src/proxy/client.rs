//! Upstream HTTP client.
//!
//! # Responsibilities
//! - Send one request to the upstream and hand back its response
//! - Enforce the per-call deadline
//!
//! # Design Decisions
//! - Pooled hyper-util client shared across requests
//! - Timeout covers connect + response head; bodies stream afterwards
//! - Timeouts are distinct from other failures (504 vs 502)

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

/// Errors talking to the upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Upstream address could not be turned into a request target.
    #[error("invalid upstream address: {0}")]
    InvalidAddress(String),

    /// Outgoing request could not be built.
    #[error("invalid upstream request: {0}")]
    Build(#[from] axum::http::Error),

    /// Connection or protocol failure.
    #[error("upstream request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("upstream I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No response within the deadline.
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),
}

impl UpstreamError {
    /// Gateway status reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            UpstreamError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::InvalidAddress(_) | UpstreamError::Build(_) => "build",
            UpstreamError::Request(_) => "request",
            UpstreamError::Io(_) => "io",
            UpstreamError::Timeout(_) => "timeout",
        }
    }
}

/// Something that can deliver a request to the upstream.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn send(
        &self,
        request: Request<Body>,
        timeout: Duration,
    ) -> Result<Response<Body>, UpstreamError>;
}

/// Pooled HTTP/1.1 client over hyper-util.
#[derive(Clone)]
pub struct HyperUpstreamClient {
    client: Client<HttpConnector, Body>,
}

impl HyperUpstreamClient {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HyperUpstreamClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpstreamClient for HyperUpstreamClient {
    async fn send(
        &self,
        request: Request<Body>,
        timeout: Duration,
    ) -> Result<Response<Body>, UpstreamError> {
        let response: Response<Incoming> =
            tokio::time::timeout(timeout, self.client.request(request))
                .await
                .map_err(|_| UpstreamError::Timeout(timeout))??;
        Ok(response.map(Body::new))
    }
}
