//! HTTP dispatch server library.
//!
//! Routes requests to registered handlers through interceptors, CORS policy
//! merging, multipart exposure and a single exception resolver, or forwards
//! them unchanged to one upstream as a reverse proxy.

pub mod config;
pub mod cors;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod multipart;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::schema::ServerConfig;
pub use dispatch::{Dispatcher, DispatcherBuilder};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
