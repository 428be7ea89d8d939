//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → dispatcher.rs (route lookup or proxy mode)
//!     → interceptor.rs (before hooks, registration order)
//!     → adapter.rs (first adapter supporting the handler)
//!         ← context.rs (CORS policy, multipart upload, converter)
//!         → converter.rs (values → response body)
//!     → interceptor.rs (after hooks, reverse order)
//!     → resolver.rs (any error → ExceptionEnvelope, exactly once)
//! Response<Body>
//! ```

pub mod adapter;
pub mod context;
pub mod converter;
pub mod dispatcher;
pub mod error;
pub mod interceptor;
pub mod resolver;

pub use adapter::{
    HandlerAdapter, HandlerRef, RequestHandler, RequestHandlerAdapter, ViewHandler,
    ViewHandlerAdapter,
};
pub use context::HandlerContext;
pub use converter::{JsonMessageConverter, MessageConverter};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{BoxError, DispatchError, DispatchResult, HttpException};
pub use interceptor::{Interceptor, InterceptorChain};
pub use resolver::{DefaultExceptionResolver, ExceptionEnvelope, ExceptionResolver};
