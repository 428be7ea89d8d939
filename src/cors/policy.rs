//! Cross-origin policy types and response header application.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Method, Response, StatusCode},
};
use serde::{Deserialize, Serialize};

use crate::dispatch::error::{DispatchError, DispatchResult};

/// `max_age` used when neither scope sets one.
pub const DEFAULT_MAX_AGE_SECS: u64 = 1800;

/// A cross-origin policy as declared at one scope (global or endpoint).
///
/// Empty lists and `None` mean "not specified at this scope". A negative
/// `max_age` is unset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct CrossOrigin {
    /// Legacy alias of `origins`.
    pub value: Vec<String>,
    pub origins: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub methods: Vec<String>,
    pub allow_credentials: Option<bool>,
    pub max_age: i64,
}

impl Default for CrossOrigin {
    fn default() -> Self {
        Self {
            value: Vec::new(),
            origins: Vec::new(),
            allowed_headers: Vec::new(),
            exposed_headers: Vec::new(),
            methods: Vec::new(),
            allow_credentials: None,
            max_age: -1,
        }
    }
}

impl CrossOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origins.push(origin.into());
        self
    }

    pub fn allowed_header(mut self, name: impl Into<String>) -> Self {
        self.allowed_headers.push(name.into());
        self
    }

    pub fn exposed_header(mut self, name: impl Into<String>) -> Self {
        self.exposed_headers.push(name.into());
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.methods.push(method.into());
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = Some(allow);
        self
    }

    pub fn max_age(mut self, secs: i64) -> Self {
        self.max_age = secs;
        self
    }
}

/// The merged, immutable policy applied to a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub(crate) origins: Vec<String>,
    pub(crate) allowed_headers: Vec<String>,
    pub(crate) exposed_headers: Vec<String>,
    pub(crate) methods: Vec<String>,
    pub(crate) allow_credentials: bool,
    pub(crate) max_age: u64,
}

impl CorsPolicy {
    pub fn origins(&self) -> &[String] {
        &self.origins
    }

    pub fn allowed_headers(&self) -> &[String] {
        &self.allowed_headers
    }

    pub fn exposed_headers(&self) -> &[String] {
        &self.exposed_headers
    }

    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    pub fn allow_credentials(&self) -> bool {
        self.allow_credentials
    }

    pub fn max_age(&self) -> u64 {
        self.max_age
    }

    fn is_wildcard(&self) -> bool {
        self.origins.iter().any(|o| o == "*")
    }

    fn allows_origin(&self, origin: &str) -> bool {
        self.origins.is_empty()
            || self.is_wildcard()
            || self.origins.iter().any(|o| o.eq_ignore_ascii_case(origin))
    }

    fn allows_method(&self, method: &Method) -> bool {
        self.methods.is_empty()
            || self
                .methods
                .iter()
                .any(|m| m == "*" || m.eq_ignore_ascii_case(method.as_str()))
    }

    fn allows_header(&self, name: &str) -> bool {
        self.allowed_headers.is_empty()
            || self
                .allowed_headers
                .iter()
                .any(|h| h == "*" || h.eq_ignore_ascii_case(name))
    }

    /// Write the `Access-Control-*` headers this request calls for.
    ///
    /// Preflights are answered completely here; the caller must not run the
    /// handler when `CorsOutcome::Preflight` is returned.
    pub fn apply(
        &self,
        method: &Method,
        headers: &HeaderMap,
        response: &mut Response<Body>,
    ) -> DispatchResult<CorsOutcome> {
        let Some(origin) = headers.get(header::ORIGIN) else {
            return Ok(CorsOutcome::NotCors);
        };
        let origin_str = origin.to_str().unwrap_or_default();
        if !self.allows_origin(origin_str) {
            tracing::debug!(origin = %origin_str, "Origin rejected by CORS policy");
            return Err(DispatchError::CorsRejected(format!(
                "origin {origin_str} is not allowed"
            )));
        }

        let allow_origin = if self.is_wildcard() && !self.allow_credentials {
            HeaderValue::from_static("*")
        } else {
            origin.clone()
        };

        if let Some(requested) = preflight_method(method, headers) {
            if !self.allows_method(&requested) {
                return Err(DispatchError::CorsRejected(format!(
                    "method {requested} is not allowed"
                )));
            }
            let requested_headers = requested_headers(headers);
            if let Some(denied) = requested_headers.iter().find(|h| !self.allows_header(h)) {
                return Err(DispatchError::CorsRejected(format!(
                    "header {denied} is not allowed"
                )));
            }

            *response.status_mut() = StatusCode::OK;
            *response.body_mut() = Body::empty();
            self.write_common(response, allow_origin);

            let methods = if self.methods.is_empty() {
                requested.to_string()
            } else {
                self.methods.join(", ")
            };
            insert_joined(response, header::ACCESS_CONTROL_ALLOW_METHODS, &methods);
            if !requested_headers.is_empty() {
                insert_joined(
                    response,
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    &requested_headers.join(", "),
                );
            }
            response
                .headers_mut()
                .insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(self.max_age));
            return Ok(CorsOutcome::Preflight);
        }

        self.write_common(response, allow_origin);
        if !self.exposed_headers.is_empty() {
            insert_joined(
                response,
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                &self.exposed_headers.join(", "),
            );
        }
        Ok(CorsOutcome::Actual)
    }

    fn write_common(&self, response: &mut Response<Body>, allow_origin: HeaderValue) {
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
        if self.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
    }
}

/// What `CorsPolicy::apply` did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorsOutcome {
    /// No `Origin` header.
    NotCors,
    /// Preflight answered; skip the handler.
    Preflight,
    /// Cross-origin request allowed; run the handler.
    Actual,
}

/// The method a preflight asks about, if the request is a preflight.
pub fn preflight_method(method: &Method, headers: &HeaderMap) -> Option<Method> {
    if method != Method::OPTIONS || !headers.contains_key(header::ORIGIN) {
        return None;
    }
    headers
        .get(header::ACCESS_CONTROL_REQUEST_METHOD)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Method::from_bytes(v.trim().as_bytes()).ok())
}

fn requested_headers(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

fn insert_joined(response: &mut Response<Body>, name: header::HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response.headers_mut().insert(name, value);
    }
}
