//! Dispatch error taxonomy.
//!
//! Protocol exceptions carry the response they should produce. Everything
//! else is unexpected and becomes a 500 through the default resolver.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use thiserror::Error;

use crate::dispatch::resolver::ExceptionEnvelope;
use crate::proxy::UpstreamError;

/// Boxed error accepted from handlers and collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// An application-level failure that knows its own status and body.
#[derive(Debug, Clone)]
pub struct HttpException {
    status: StatusCode,
    body: Bytes,
    content_type: Option<HeaderValue>,
    headers: HeaderMap,
}

impl HttpException {
    /// Create an exception with a plain-text body.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: Some(HeaderValue::from_static("text/plain; charset=utf-8")),
            headers: HeaderMap::new(),
        }
    }

    /// Replace the body content type.
    pub fn with_content_type(mut self, content_type: HeaderValue) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Add an extra response header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn envelope(&self) -> ExceptionEnvelope {
        ExceptionEnvelope {
            status: self.status,
            body: self.body.clone(),
            content_type: self.content_type.clone(),
            headers: self.headers.clone(),
        }
    }
}

impl std::fmt::Display for HttpException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, String::from_utf8_lossy(&self.body))
    }
}

impl std::error::Error for HttpException {}

/// Errors raised anywhere between route resolution and response finalization.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Explicit protocol exception raised by application code.
    #[error("{0}")]
    Http(HttpException),

    /// No registered route matches the path.
    #[error("No route matches {method} {path}")]
    NotFound { method: Method, path: String },

    /// A route matches the path but not the method.
    #[error("Method {method} is not supported for {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    /// Declared request length exceeds the multipart size limit.
    #[error("Request body of {actual} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: i64, actual: i64 },

    /// Cross-origin request rejected by the effective policy.
    #[error("Invalid CORS request: {0}")]
    CorsRejected(String),

    /// No registered adapter claims the route's handler.
    #[error("No adapter supports handler of type {0}")]
    NoAdapter(&'static str),

    /// Reverse proxy could not reach the upstream.
    #[error("Upstream failure: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other failure.
    #[error("{0}")]
    Unexpected(BoxError),
}

impl DispatchError {
    /// Wrap an arbitrary error as unexpected.
    pub fn unexpected(error: impl Into<BoxError>) -> Self {
        DispatchError::Unexpected(error.into())
    }

    /// The envelope this error carries if it is a protocol exception.
    pub fn protocol(&self) -> Option<ExceptionEnvelope> {
        let envelope = match self {
            DispatchError::Http(exception) => exception.envelope(),
            DispatchError::NotFound { .. } => {
                ExceptionEnvelope::text(StatusCode::NOT_FOUND, self.to_string())
            }
            DispatchError::MethodNotAllowed { allowed, .. } => {
                let mut envelope =
                    ExceptionEnvelope::text(StatusCode::METHOD_NOT_ALLOWED, self.to_string());
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    envelope.headers.insert(header::ALLOW, value);
                }
                envelope
            }
            DispatchError::PayloadTooLarge { .. } => {
                ExceptionEnvelope::text(StatusCode::PAYLOAD_TOO_LARGE, self.to_string())
            }
            DispatchError::CorsRejected(_) => {
                ExceptionEnvelope::text(StatusCode::FORBIDDEN, "Invalid CORS request")
            }
            DispatchError::Upstream(error) => {
                ExceptionEnvelope::text(error.status(), self.to_string())
            }
            DispatchError::NoAdapter(_)
            | DispatchError::Io(_)
            | DispatchError::Serialization(_)
            | DispatchError::Unexpected(_) => return None,
        };
        Some(envelope)
    }
}

impl From<HttpException> for DispatchError {
    fn from(exception: HttpException) -> Self {
        DispatchError::Http(exception)
    }
}
