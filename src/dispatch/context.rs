//! Per-request context handed to adapters and handlers.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response},
};

use crate::cors::{CorsOutcome, CorsPolicy};
use crate::dispatch::converter::MessageConverter;
use crate::dispatch::error::DispatchResult;
use crate::multipart::{MultipartConfig, RequestUpload};

/// What the dispatcher resolved for the matched route.
pub struct HandlerContext {
    cors: Option<Arc<CorsPolicy>>,
    upload: Option<RequestUpload>,
    multipart_config: Option<MultipartConfig>,
    converter: Arc<dyn MessageConverter>,
}

impl HandlerContext {
    pub fn new(converter: Arc<dyn MessageConverter>) -> Self {
        Self {
            cors: None,
            upload: None,
            multipart_config: None,
            converter,
        }
    }

    pub(crate) fn with_cors(mut self, policy: Option<Arc<CorsPolicy>>) -> Self {
        self.cors = policy;
        self
    }

    pub(crate) fn with_upload(
        mut self,
        upload: Option<RequestUpload>,
        config: Option<MultipartConfig>,
    ) -> Self {
        self.upload = upload;
        self.multipart_config = config;
        self
    }

    /// Effective CORS policy of the route, if it declares one.
    pub fn cors_policy(&self) -> Option<&CorsPolicy> {
        self.cors.as_deref()
    }

    /// Apply the route's CORS policy; `NotCors` when it has none.
    pub fn apply_cors(
        &self,
        request: &Request<Body>,
        response: &mut Response<Body>,
    ) -> DispatchResult<CorsOutcome> {
        match &self.cors {
            Some(policy) => policy.apply(request.method(), request.headers(), response),
            None => Ok(CorsOutcome::NotCors),
        }
    }

    /// Multipart upload source, present when the body is multipart.
    pub fn upload(&mut self) -> Option<&mut RequestUpload> {
        self.upload.as_mut()
    }

    pub fn take_upload(&mut self) -> Option<RequestUpload> {
        self.upload.take()
    }

    /// Limits for the multipart parser, route config first.
    pub fn multipart_config(&self) -> Option<&MultipartConfig> {
        self.multipart_config.as_ref()
    }

    pub fn converter(&self) -> &dyn MessageConverter {
        self.converter.as_ref()
    }
}
