//! Request body exposed as an upload source.
//!
//! # Responsibilities
//! - Report encoding, content type and declared length of the body
//! - Hand the body out as a stream exactly once
//!
//! # Design Decisions
//! - No buffering or spooling here; the parser owns that
//! - The 32-bit length saturates, the 64-bit length is exact

use axum::{
    body::{Body, BodyDataStream},
    http::{header, HeaderMap, Method, Request},
};

/// Single-use upload source over a request body.
#[derive(Debug)]
pub struct RequestUpload {
    character_encoding: Option<String>,
    content_type: Option<String>,
    content_length: i64,
    body: Option<Body>,
}

impl RequestUpload {
    /// Take the body out of `request`, leaving an empty one behind.
    pub fn from_request(request: &mut Request<Body>) -> Self {
        let body = std::mem::take(request.body_mut());
        Self::new(request.headers(), body)
    }

    pub fn new(headers: &HeaderMap, body: Body) -> Self {
        Self {
            character_encoding: header_string(headers, header::CONTENT_ENCODING),
            content_type: header_string(headers, header::CONTENT_TYPE),
            content_length: headers
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|len| *len >= 0)
                .unwrap_or(-1),
            body: Some(body),
        }
    }

    pub fn character_encoding(&self) -> Option<&str> {
        self.character_encoding.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Declared length, `-1` if unknown, `i32::MAX` if it does not fit.
    pub fn content_length(&self) -> i32 {
        i32::try_from(self.content_length).unwrap_or(i32::MAX)
    }

    /// Declared length, `-1` if unknown.
    pub fn content_length_long(&self) -> i64 {
        self.content_length
    }

    /// Open the body stream. Fails on every call after the first.
    pub fn open_stream(&mut self) -> std::io::Result<BodyDataStream> {
        self.body.take().map(Body::into_data_stream).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                "upload stream has already been consumed",
            )
        })
    }
}

/// True when a request with this method and these headers carries a
/// multipart body.
pub fn is_multipart(method: &Method, headers: &HeaderMap) -> bool {
    if matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    ) {
        return false;
    }
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.trim_start()
                .get(..10)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("multipart/"))
        })
        .unwrap_or(false)
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
