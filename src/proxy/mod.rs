//! Reverse proxy mode.
//!
//! # Data Flow
//! ```text
//! Dispatcher (proxy mode)
//!     → handler.rs (rewrite target, strip hop-by-hop headers)
//!     → client.rs (pooled hyper-util client, deadline)
//!     → Upstream
//!     → handler.rs (relay status, end-to-end headers, streaming body)
//! ```

pub mod client;
pub mod handler;

pub use client::{HyperUpstreamClient, UpstreamClient, UpstreamError};
pub use handler::{ProxyHandler, Upstream, DEFAULT_UPSTREAM_TIMEOUT};
