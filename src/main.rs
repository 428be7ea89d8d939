//! HTTP dispatch server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (request ID, trace, timeout)
//!                          │
//!                          ▼
//!                  dispatch::Dispatcher ──── interceptors (before)
//!                     │             │
//!           route mode│             │proxy mode
//!                     ▼             ▼
//!     routing + adapter + CORS   proxy::ProxyHandler ──▶ Upstream
//!                     │             │
//!                     ▼             ▼
//!                   interceptors (after) + exception resolver
//!                          │
//!     Client Response ◀────┘
//! ```
//!
//! Without `--upstream` or a `[proxy]` section the server runs in route mode
//! and only serves `GET /status`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{body::Body, http::Request};
use clap::Parser;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use dispatch_server::config::{self, ConfigError, ProxySettings, ServerConfig};
use dispatch_server::cors::CrossOrigin;
use dispatch_server::dispatch::{DispatchResult, Dispatcher, HandlerContext, ViewHandler};
use dispatch_server::http::HttpServer;
use dispatch_server::lifecycle::{spawn_signal_handler, Shutdown};
use dispatch_server::observability::{logging, metrics};
use dispatch_server::proxy::{ProxyHandler, Upstream, UpstreamError};
use dispatch_server::routing::Route;

#[derive(Parser, Debug)]
#[command(name = "dispatch-server")]
#[command(about = "HTTP dispatch server and reverse proxy", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listener address, overrides `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Forward every request to this upstream.
    #[arg(short, long)]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(upstream) = cli.upstream {
        config.proxy = Some(ProxySettings {
            upstream,
            ..config.proxy.unwrap_or_default()
        });
    }
    config::validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dispatch-server starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let dispatcher = Arc::new(build_dispatcher(&config)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    spawn_signal_handler(shutdown);

    HttpServer::new(dispatcher, &config.listener)
        .run(listener, stop)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_dispatcher(config: &ServerConfig) -> Result<Dispatcher, UpstreamError> {
    let mut builder = Dispatcher::builder().multipart_config(config.multipart.clone());
    if let Some(cors) = &config.cors {
        builder = builder.global_cors(cors.clone());
    }

    match &config.proxy {
        Some(settings) => {
            let proxy = ProxyHandler::new(Upstream::parse(&settings.upstream)?)
                .with_timeout(Duration::from_secs(settings.timeout_secs));
            builder = builder.proxy(proxy);
        }
        None => {
            builder = builder.route(
                Route::get("/status", Status)
                    .name("status")
                    .cross_origin(CrossOrigin::new()),
            );
        }
    }

    Ok(builder.build())
}

/// Liveness probe for route mode.
struct Status;

#[async_trait]
impl ViewHandler for Status {
    async fn handle(
        &self,
        _request: &mut Request<Body>,
        _ctx: &mut HandlerContext,
    ) -> DispatchResult<Value> {
        Ok(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }
}
