//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, HTTP/1.1 + HTTP/2, middleware)
//!     → request.rs (request ID)
//!     → Dispatcher::dispatch
//!     → headers.rs (hop-by-hop filtering, proxy mode)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod server;

pub use headers::{copy_end_to_end, is_hop_by_hop, HOP_BY_HOP_HEADERS};
pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;
