//! Route registration.

use axum::http::Method;

use crate::cors::CrossOrigin;
use crate::dispatch::adapter::{HandlerRef, RequestHandler, ViewHandler};
use crate::multipart::MultipartConfig;
use crate::routing::matcher::{MethodMatcher, PathPattern};

/// A path pattern and method set bound to a handler.
#[derive(Debug, Clone)]
pub struct Route {
    name: Option<String>,
    methods: MethodMatcher,
    pattern: PathPattern,
    handler: HandlerRef,
    multipart: Option<MultipartConfig>,
    cross_origin: Option<CrossOrigin>,
}

impl Route {
    /// Route accepting any method until one is added.
    pub fn new(pattern: &str, handler: HandlerRef) -> Self {
        Self {
            name: None,
            methods: MethodMatcher::any(),
            pattern: PathPattern::parse(pattern),
            handler,
            multipart: None,
            cross_origin: None,
        }
    }

    pub fn get(pattern: &str, handler: impl ViewHandler + 'static) -> Self {
        Self::new(pattern, HandlerRef::view(handler)).method(Method::GET)
    }

    pub fn post(pattern: &str, handler: impl ViewHandler + 'static) -> Self {
        Self::new(pattern, HandlerRef::view(handler)).method(Method::POST)
    }

    pub fn put(pattern: &str, handler: impl ViewHandler + 'static) -> Self {
        Self::new(pattern, HandlerRef::view(handler)).method(Method::PUT)
    }

    pub fn delete(pattern: &str, handler: impl ViewHandler + 'static) -> Self {
        Self::new(pattern, HandlerRef::view(handler)).method(Method::DELETE)
    }

    /// Route for a handler that writes the response itself.
    pub fn raw(method: Method, pattern: &str, handler: impl RequestHandler + 'static) -> Self {
        Self::new(pattern, HandlerRef::request(handler)).method(method)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.methods.add(method);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Override the dispatcher-wide multipart limits for this route.
    pub fn multipart(mut self, config: MultipartConfig) -> Self {
        self.multipart = Some(config);
        self
    }

    /// Declare an endpoint CORS policy, merged with the global one.
    pub fn cross_origin(mut self, policy: CrossOrigin) -> Self {
        self.cross_origin = Some(policy);
        self
    }

    pub fn route_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn methods(&self) -> &MethodMatcher {
        &self.methods
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    pub fn multipart_config(&self) -> Option<&MultipartConfig> {
        self.multipart.as_ref()
    }

    pub fn cross_origin_policy(&self) -> Option<&CrossOrigin> {
        self.cross_origin.as_ref()
    }
}
