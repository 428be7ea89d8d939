//! Cross-origin resource sharing.
//!
//! # Data Flow
//! ```text
//! global CrossOrigin (config) + endpoint CrossOrigin (route)
//!     → cache.rs (lookup by pair content)
//!     → merge.rs (on miss)
//!     → CorsPolicy (immutable, shared via Arc)
//!     → policy.rs apply() writes Access-Control-* headers
//! ```

pub mod cache;
pub mod merge;
pub mod policy;

pub use cache::CorsPolicyCache;
pub use merge::merge;
pub use policy::{preflight_method, CorsOutcome, CorsPolicy, CrossOrigin};
