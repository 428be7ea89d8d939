//! Dispatcher core.
//!
//! # Responsibilities
//! - Resolve a request to a route, or forward it in proxy mode
//! - Run the interceptor chain around handler execution
//! - Hand the handler its CORS policy and multipart upload
//! - Translate every failure into a response through one resolver
//!
//! # Design Decisions
//! - Registration happens on `DispatcherBuilder`; the built dispatcher is
//!   immutable and shared as `Arc<Dispatcher>` without locks
//! - Built-in adapters run after user adapters, so users can claim any type
//! - The resolver runs at most once for the main path and once more if an
//!   after hook fails

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    http::{request::Parts, Request, Response},
};
use tracing::Instrument;

use crate::cors::{preflight_method, CorsPolicyCache, CrossOrigin};
use crate::dispatch::adapter::{HandlerAdapter, RequestHandlerAdapter, ViewHandlerAdapter};
use crate::dispatch::context::HandlerContext;
use crate::dispatch::converter::{JsonMessageConverter, MessageConverter};
use crate::dispatch::error::{DispatchError, DispatchResult};
use crate::dispatch::interceptor::{Interceptor, InterceptorChain};
use crate::dispatch::resolver::{DefaultExceptionResolver, ExceptionResolver};
use crate::http::request::RequestIdExt;
use crate::multipart::{is_multipart, MultipartConfig, RequestUpload};
use crate::observability::metrics;
use crate::proxy::ProxyHandler;
use crate::routing::{Route, RouteMatch, Router};

/// Setup surface for a `Dispatcher`. Consumed by `build`.
#[derive(Default)]
pub struct DispatcherBuilder {
    adapters: Vec<Arc<dyn HandlerAdapter>>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    converter: Option<Arc<dyn MessageConverter>>,
    resolver: Option<Arc<dyn ExceptionResolver>>,
    multipart: Option<MultipartConfig>,
    routes: Vec<Route>,
    global_cors: CrossOrigin,
    proxy: Option<ProxyHandler>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler adapter. Tried before the built-in ones.
    pub fn adapter(mut self, adapter: impl HandlerAdapter + 'static) -> Self {
        self.adapters.push(Arc::new(adapter));
        self
    }

    /// Append an interceptor. Registration order is execution order.
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn message_converter(mut self, converter: impl MessageConverter + 'static) -> Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Replace the default resolver entirely.
    pub fn exception_resolver(mut self, resolver: impl ExceptionResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn multipart_config(mut self, config: MultipartConfig) -> Self {
        self.multipart = Some(config);
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Policy merged under every route-level `cross_origin`.
    pub fn global_cors(mut self, policy: CrossOrigin) -> Self {
        self.global_cors = policy;
        self
    }

    /// Switch to proxy mode: routes are ignored and every request is forwarded.
    pub fn proxy(mut self, proxy: ProxyHandler) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn build(self) -> Dispatcher {
        let mut adapters = self.adapters;
        adapters.push(Arc::new(RequestHandlerAdapter));
        adapters.push(Arc::new(ViewHandlerAdapter));

        if let Some(proxy) = &self.proxy {
            tracing::info!(upstream = %proxy.upstream(), "Dispatcher in proxy mode");
        }

        Dispatcher {
            router: Router::new(self.routes),
            interceptors: InterceptorChain::new(self.interceptors),
            adapters,
            resolver: self
                .resolver
                .unwrap_or_else(|| Arc::new(DefaultExceptionResolver)),
            converter: self
                .converter
                .unwrap_or_else(|| Arc::new(JsonMessageConverter)),
            multipart: self.multipart,
            global_cors: self.global_cors,
            cors_cache: CorsPolicyCache::new(),
            proxy: self.proxy,
        }
    }
}

/// Frozen registration state plus the per-request algorithm.
pub struct Dispatcher {
    router: Router,
    interceptors: InterceptorChain,
    adapters: Vec<Arc<dyn HandlerAdapter>>,
    resolver: Arc<dyn ExceptionResolver>,
    converter: Arc<dyn MessageConverter>,
    multipart: Option<MultipartConfig>,
    global_cors: CrossOrigin,
    cors_cache: CorsPolicyCache,
    proxy: Option<ProxyHandler>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn is_proxy(&self) -> bool {
        self.proxy.is_some()
    }

    /// Produce the response for one request. Never fails.
    pub async fn dispatch(&self, request: Request<Body>) -> Response<Body> {
        let (head, body) = request.into_parts();
        let span = tracing::info_span!(
            "dispatch",
            request_id = %head.request_id().unwrap_or("-"),
            method = %head.method,
            path = %head.uri.path()
        );
        self.run(head, body).instrument(span).await
    }

    async fn run(&self, mut head: Parts, body: Body) -> Response<Body> {
        let start = Instant::now();
        let mode = if self.is_proxy() { "proxy" } else { "route" };
        let mut response = Response::new(Body::empty());
        let mut passed = 0;

        if let Err(error) = self.execute(&mut head, body, &mut response, &mut passed).await {
            self.resolve_into(&head, &error, &mut response);
        }
        if let Err(error) = self
            .interceptors
            .apply_after(passed, &head, &mut response)
            .await
        {
            self.resolve_into(&head, &error, &mut response);
        }

        tracing::debug!(status = %response.status(), "Dispatch complete");
        metrics::record_request(head.method.as_str(), response.status().as_u16(), mode, start);
        response
    }

    async fn execute(
        &self,
        head: &mut Parts,
        body: Body,
        response: &mut Response<Body>,
        passed: &mut usize,
    ) -> DispatchResult<()> {
        if let Some(proxy) = &self.proxy {
            if !self.run_before(head, response, passed).await? {
                return Ok(());
            }
            *response = proxy.forward(head, body).await?;
            return Ok(());
        }

        let RouteMatch { route, params } = self.resolve_route(head)?;
        head.extensions.insert(params);

        if !self.run_before(head, response, passed).await? {
            return Ok(());
        }

        let handler = route.handler();
        let adapter = self
            .adapters
            .iter()
            .find(|adapter| adapter.supports(handler))
            .ok_or(DispatchError::NoAdapter(handler.type_name()))?;

        let cors = route
            .cross_origin_policy()
            .map(|endpoint| self.cors_cache.effective(&self.global_cors, endpoint));

        let multipart = route.multipart_config().or(self.multipart.as_ref()).cloned();
        let (upload, body) = if is_multipart(&head.method, &head.headers) {
            let upload = RequestUpload::new(&head.headers, body);
            if let Some(config) = &multipart {
                config.check_request_size(upload.content_length_long())?;
            }
            (Some(upload), Body::empty())
        } else {
            (None, body)
        };

        let mut ctx = HandlerContext::new(self.converter.clone())
            .with_cors(cors)
            .with_upload(upload, multipart);

        // The adapter owns the request for the call; the head comes back for
        // the after hooks and the resolver.
        let placeholder = Request::new(()).into_parts().0;
        let mut request = Request::from_parts(std::mem::replace(head, placeholder), body);
        let result = adapter
            .execute(handler, &mut request, response, &mut ctx)
            .await;
        *head = request.into_parts().0;
        result
    }

    /// Route lookup with preflight fallback to the requested method.
    fn resolve_route(&self, head: &Parts) -> DispatchResult<RouteMatch<'_>> {
        let path = head.uri.path();
        let err = match self.router.resolve(&head.method, path) {
            Ok(matched) => return Ok(matched),
            Err(err) => err,
        };

        if let Some(requested) = preflight_method(&head.method, &head.headers) {
            if let Ok(matched) = self.router.resolve(&requested, path) {
                if matched.route.cross_origin_policy().is_some() {
                    return Ok(matched);
                }
            }
        }
        Err(err)
    }

    async fn run_before(
        &self,
        head: &Parts,
        response: &mut Response<Body>,
        passed: &mut usize,
    ) -> DispatchResult<bool> {
        let outcome = self.interceptors.apply_before(head, response).await;
        *passed = outcome.passed;
        outcome.result
    }

    fn resolve_into(&self, head: &Parts, error: &DispatchError, response: &mut Response<Body>) {
        let envelope = self.resolver.resolve(head, error);
        tracing::debug!(status = %envelope.status, error = %error, "Resolved dispatch error");
        envelope.apply(response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::adapter::{RequestHandler, ViewHandler};
    use crate::dispatch::interceptor::tests::{FailingAfter, FailingBefore, Recording};
    use crate::dispatch::resolver::ExceptionEnvelope;
    use crate::proxy::{Upstream, UpstreamClient, UpstreamError};
    use crate::routing::PathParams;
    use async_trait::async_trait;
    use axum::http::{header, Method, StatusCode};
    use futures_util::StreamExt;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    struct Echo;

    #[async_trait]
    impl ViewHandler for Echo {
        async fn handle(
            &self,
            request: &mut Request<Body>,
            _ctx: &mut HandlerContext,
        ) -> DispatchResult<Value> {
            let id = request
                .extensions()
                .get::<PathParams>()
                .and_then(|p| p.get("id"))
                .unwrap_or("none")
                .to_string();
            Ok(json!({ "id": id }))
        }
    }

    struct Boom;

    #[async_trait]
    impl ViewHandler for Boom {
        async fn handle(
            &self,
            _request: &mut Request<Body>,
            _ctx: &mut HandlerContext,
        ) -> DispatchResult<Value> {
            Err(DispatchError::unexpected("boom"))
        }
    }

    /// Writes the upload's content type and body back.
    struct Upload;

    #[async_trait]
    impl RequestHandler for Upload {
        async fn handle(
            &self,
            _request: &mut Request<Body>,
            response: &mut Response<Body>,
            ctx: &mut HandlerContext,
        ) -> DispatchResult<()> {
            let upload = ctx
                .upload()
                .ok_or_else(|| DispatchError::unexpected("no upload"))?;
            let content_type = upload.content_type().unwrap_or_default().to_string();
            let mut stream = upload.open_stream()?;
            let mut bytes = Vec::new();
            while let Some(chunk) = stream.next().await {
                bytes.extend_from_slice(&chunk.map_err(DispatchError::unexpected)?);
            }
            *response.body_mut() = Body::from(format!("{content_type}|{}", bytes.len()));
            Ok(())
        }
    }

    struct Teapot;

    impl ExceptionResolver for Teapot {
        fn resolve(&self, _request: &Parts, _error: &DispatchError) -> ExceptionEnvelope {
            ExceptionEnvelope::text(StatusCode::IM_A_TEAPOT, "custom")
        }
    }

    struct Refused;

    #[async_trait]
    impl UpstreamClient for Refused {
        async fn send(
            &self,
            _request: Request<Body>,
            _timeout: Duration,
        ) -> Result<Response<Body>, UpstreamError> {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into())
        }
    }

    fn recording(name: &'static str, proceed: bool, log: &Arc<Mutex<Vec<String>>>) -> Recording {
        Recording {
            name,
            proceed,
            log: log.clone(),
        }
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_path_params_reach_handler() {
        let dispatcher = Dispatcher::builder()
            .route(Route::get("/items/{id}", Echo))
            .build();

        let response = dispatcher.dispatch(get("/items/42")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"id":"42"}"#);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let dispatcher = Dispatcher::builder()
            .route(Route::get("/items/{id}", Echo))
            .build();

        let response = dispatcher.dispatch(get("/nothing")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(response).await, "No route matches GET /nothing");
    }

    #[tokio::test]
    async fn test_wrong_method_is_405_with_allow() {
        let dispatcher = Dispatcher::builder()
            .route(Route::get("/items/{id}", Echo))
            .build();
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/items/1")
            .body(Body::empty())
            .unwrap();

        let response = dispatcher.dispatch(request).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET");
    }

    #[tokio::test]
    async fn test_handler_error_unwinds_after_hooks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::builder()
            .interceptor(recording("A", true, &log))
            .interceptor(recording("B", true, &log))
            .route(Route::get("/boom", Boom))
            .build();

        let response = dispatcher.dispatch(get("/boom")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_string(response).await, "Server internal error: boom");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before:A", "before:B", "after:B", "after:A"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler_and_afters() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::builder()
            .interceptor(recording("A", false, &log))
            .interceptor(recording("B", true, &log))
            .route(Route::get("/boom", Boom))
            .build();

        let response = dispatcher.dispatch(get("/boom")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*log.lock().unwrap(), vec!["before:A"]);
    }

    #[tokio::test]
    async fn test_before_hook_error_is_resolved_and_unwinds_passed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dispatcher = Dispatcher::builder()
            .interceptor(recording("A", true, &log))
            .interceptor(FailingBefore)
            .interceptor(recording("C", true, &log))
            .route(Route::get("/items/{id}", Echo))
            .build();

        let response = dispatcher.dispatch(get("/items/1")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_string(response).await,
            "Server internal error: before failed"
        );
        assert_eq!(*log.lock().unwrap(), vec!["before:A", "after:A"]);
    }

    #[tokio::test]
    async fn test_custom_resolver_replaces_default() {
        let dispatcher = Dispatcher::builder()
            .exception_resolver(Teapot)
            .route(Route::get("/boom", Boom))
            .build();

        let response = dispatcher.dispatch(get("/boom")).await;

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(body_string(response).await, "custom");
    }

    #[tokio::test]
    async fn test_after_hook_error_is_resolved() {
        let dispatcher = Dispatcher::builder()
            .interceptor(FailingAfter)
            .route(Route::get("/items/{id}", Echo))
            .build();

        let response = dispatcher.dispatch(get("/items/1")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_string(response).await,
            "Server internal error: after failed"
        );
    }

    #[tokio::test]
    async fn test_multipart_upload_reaches_handler() {
        let dispatcher = Dispatcher::builder()
            .route(Route::raw(Method::POST, "/upload", Upload))
            .build();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
            .header(header::CONTENT_LENGTH, "5")
            .body(Body::from("hello"))
            .unwrap();

        let response = dispatcher.dispatch(request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "multipart/form-data; boundary=x|5"
        );
    }

    #[tokio::test]
    async fn test_oversized_multipart_is_413() {
        let limit = MultipartConfig {
            max_request_size: 4,
            ..MultipartConfig::default()
        };
        let dispatcher = Dispatcher::builder()
            .multipart_config(limit)
            .route(Route::raw(Method::POST, "/upload", Upload))
            .build();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
            .header(header::CONTENT_LENGTH, "5")
            .body(Body::from("hello"))
            .unwrap();

        let response = dispatcher.dispatch(request).await;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_preflight_uses_requested_method_route() {
        let dispatcher = Dispatcher::builder()
            .route(
                Route::get("/items/{id}", Echo)
                    .cross_origin(CrossOrigin::new().origin("https://a.com").max_age(600)),
            )
            .build();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/items/1")
            .header(header::ORIGIN, "https://a.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();

        let response = dispatcher.dispatch(request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://a.com"
        );
        assert_eq!(response.headers()[header::ACCESS_CONTROL_MAX_AGE], "600");
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn test_disallowed_origin_is_403() {
        let dispatcher = Dispatcher::builder()
            .global_cors(CrossOrigin::new().origin("https://a.com"))
            .route(Route::get("/items/{id}", Echo).cross_origin(CrossOrigin::new()))
            .build();
        let request = Request::builder()
            .uri("/items/1")
            .header(header::ORIGIN, "https://evil.com")
            .body(Body::empty())
            .unwrap();

        let response = dispatcher.dispatch(request).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_string(response).await, "Invalid CORS request");
    }

    #[tokio::test]
    async fn test_proxy_failure_is_502_and_afters_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let proxy = ProxyHandler::new(Upstream::parse("http://upstream").unwrap())
            .with_client(Arc::new(Refused));
        let dispatcher = Dispatcher::builder()
            .interceptor(recording("A", true, &log))
            .route(Route::get("/ignored", Echo))
            .proxy(proxy)
            .build();

        let response = dispatcher.dispatch(get("/anything")).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(*log.lock().unwrap(), vec!["before:A", "after:A"]);
    }
}
