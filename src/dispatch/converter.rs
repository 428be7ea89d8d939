//! Message conversion from handler return values to response bodies.

use axum::{
    body::Body,
    http::{header, HeaderValue, Response},
};
use serde_json::Value;

use crate::dispatch::error::DispatchResult;

/// Writes a handler's return value into the response.
pub trait MessageConverter: Send + Sync {
    fn write(
        &self,
        value: Value,
        accept: Option<&HeaderValue>,
        response: &mut Response<Body>,
    ) -> DispatchResult<()>;
}

/// JSON converter; bare strings go out as plain text unless JSON is asked for.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMessageConverter;

impl MessageConverter for JsonMessageConverter {
    fn write(
        &self,
        value: Value,
        accept: Option<&HeaderValue>,
        response: &mut Response<Body>,
    ) -> DispatchResult<()> {
        let wants_json = accept
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        let (body, content_type) = match value {
            Value::Null => {
                *response.body_mut() = Body::empty();
                return Ok(());
            }
            Value::String(text) if !wants_json => (text.into_bytes(), "text/plain; charset=utf-8"),
            other => (serde_json::to_vec(&other)?, "application/json"),
        };

        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        *response.body_mut() = Body::from(body);
        Ok(())
    }
}
