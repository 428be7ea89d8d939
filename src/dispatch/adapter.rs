//! Handler adapters.
//!
//! # Responsibilities
//! - Type-erase route handlers behind `HandlerRef`
//! - Let each adapter claim the handler types it knows how to run
//! - Apply the route's CORS policy before running the handler
//!
//! # Design Decisions
//! - Adapters are tried in registration order; the first that supports the
//!   handler runs it
//! - Built-in adapters cover `RequestHandler` and `ViewHandler`

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
};
use serde_json::Value;

use crate::cors::CorsOutcome;
use crate::dispatch::context::HandlerContext;
use crate::dispatch::error::{DispatchError, DispatchResult};

/// Handler that writes the response itself.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(
        &self,
        request: &mut Request<Body>,
        response: &mut Response<Body>,
        ctx: &mut HandlerContext,
    ) -> DispatchResult<()>;
}

/// Handler that returns a value for the message converter to write.
#[async_trait]
pub trait ViewHandler: Send + Sync {
    async fn handle(
        &self,
        request: &mut Request<Body>,
        ctx: &mut HandlerContext,
    ) -> DispatchResult<Value>;
}

/// Type-erased handler registered on a route.
#[derive(Clone)]
pub struct HandlerRef {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl HandlerRef {
    /// Wrap any handler value; an adapter must know its concrete type.
    pub fn new<T: Any + Send + Sync>(handler: T) -> Self {
        Self {
            inner: Arc::new(handler),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn request<H: RequestHandler + 'static>(handler: H) -> Self {
        let handler: Arc<dyn RequestHandler> = Arc::new(handler);
        Self {
            type_name: std::any::type_name::<H>(),
            ..Self::new(handler)
        }
    }

    pub fn view<H: ViewHandler + 'static>(handler: H) -> Self {
        let handler: Arc<dyn ViewHandler> = Arc::new(handler);
        Self {
            type_name: std::any::type_name::<H>(),
            ..Self::new(handler)
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HandlerRef").field(&self.type_name).finish()
    }
}

/// Strategy that executes one category of handler.
#[async_trait]
pub trait HandlerAdapter: Send + Sync {
    fn supports(&self, handler: &HandlerRef) -> bool;

    async fn execute(
        &self,
        handler: &HandlerRef,
        request: &mut Request<Body>,
        response: &mut Response<Body>,
        ctx: &mut HandlerContext,
    ) -> DispatchResult<()>;
}

/// Runs `RequestHandler`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestHandlerAdapter;

#[async_trait]
impl HandlerAdapter for RequestHandlerAdapter {
    fn supports(&self, handler: &HandlerRef) -> bool {
        handler.is::<Arc<dyn RequestHandler>>()
    }

    async fn execute(
        &self,
        handler: &HandlerRef,
        request: &mut Request<Body>,
        response: &mut Response<Body>,
        ctx: &mut HandlerContext,
    ) -> DispatchResult<()> {
        let handler = handler
            .downcast_ref::<Arc<dyn RequestHandler>>()
            .ok_or(DispatchError::NoAdapter(handler.type_name()))?;

        if ctx.apply_cors(request, response)? == CorsOutcome::Preflight {
            return Ok(());
        }
        handler.handle(request, response, ctx).await
    }
}

/// Runs `ViewHandler`s and writes their value through the converter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ViewHandlerAdapter;

#[async_trait]
impl HandlerAdapter for ViewHandlerAdapter {
    fn supports(&self, handler: &HandlerRef) -> bool {
        handler.is::<Arc<dyn ViewHandler>>()
    }

    async fn execute(
        &self,
        handler: &HandlerRef,
        request: &mut Request<Body>,
        response: &mut Response<Body>,
        ctx: &mut HandlerContext,
    ) -> DispatchResult<()> {
        let handler = handler
            .downcast_ref::<Arc<dyn ViewHandler>>()
            .ok_or(DispatchError::NoAdapter(handler.type_name()))?;

        if ctx.apply_cors(request, response)? == CorsOutcome::Preflight {
            return Ok(());
        }
        let accept = request.headers().get(header::ACCEPT).cloned();
        let value = handler.handle(request, ctx).await?;
        ctx.converter().write(value, accept.as_ref(), response)
    }
}
