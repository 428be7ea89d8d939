//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, proxy, server produce:
//!     → logging.rs (structured log events, per-request span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the dispatch span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
