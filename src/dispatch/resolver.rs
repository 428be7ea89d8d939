//! Exception resolution.
//!
//! # Responsibilities
//! - Translate a `DispatchError` into status, body and headers
//! - Overwrite whatever partial response state a failed request left behind
//!
//! # Design Decisions
//! - Protocol exceptions pass through unchanged
//! - Everything else is a 500 with a fixed diagnostic prefix
//! - A registered resolver replaces this one entirely; the dispatcher never
//!   falls back on its own

use axum::{
    body::Body,
    http::{header, request::Parts, HeaderMap, HeaderValue, Response, StatusCode},
};
use bytes::Bytes;

use crate::dispatch::error::DispatchError;

/// Prefix of the body written for unexpected errors.
pub const INTERNAL_ERROR_PREFIX: &str = "Server internal error: ";

/// The response a failed request turns into.
#[derive(Debug, Clone)]
pub struct ExceptionEnvelope {
    pub status: StatusCode,
    pub body: Bytes,
    pub content_type: Option<HeaderValue>,
    pub headers: HeaderMap,
}

impl ExceptionEnvelope {
    /// Plain-text envelope without extra headers.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Bytes::from(body.into()),
            content_type: Some(HeaderValue::from_static("text/plain; charset=utf-8")),
            headers: HeaderMap::new(),
        }
    }

    /// Replace the response with this envelope.
    pub fn apply(self, response: &mut Response<Body>) {
        let mut replacement = Response::new(Body::from(self.body));
        *replacement.status_mut() = self.status;
        *replacement.headers_mut() = self.headers;
        if let Some(content_type) = self.content_type {
            replacement
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
        }
        *response = replacement;
    }
}

/// Maps a failed request to its final response.
pub trait ExceptionResolver: Send + Sync {
    fn resolve(&self, request: &Parts, error: &DispatchError) -> ExceptionEnvelope;
}

/// Two-tier resolver: protocol exceptions verbatim, everything else 500.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultExceptionResolver;

impl ExceptionResolver for DefaultExceptionResolver {
    fn resolve(&self, request: &Parts, error: &DispatchError) -> ExceptionEnvelope {
        if let Some(envelope) = error.protocol() {
            return envelope;
        }

        tracing::error!(
            method = %request.method,
            path = %request.uri.path(),
            error = %error,
            "Unhandled error during dispatch"
        );
        ExceptionEnvelope::text(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{INTERNAL_ERROR_PREFIX}{error}"),
        )
    }
}
