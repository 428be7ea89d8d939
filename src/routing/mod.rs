//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, path)
//!     → router.rs (route lookup, registration order)
//!     → matcher.rs (path pattern + method set)
//!     → Return: RouteMatch, NotFound, or MethodNotAllowed
//!
//! Route table (at startup):
//!     Route::get("/users/{id}", handler).cross_origin(..)
//!     → DispatcherBuilder::route(..)
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes built programmatically, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod route;
pub mod router;

pub use matcher::{MethodMatcher, PathParams, PathPattern};
pub use route::Route;
pub use router::{RouteMatch, Router};
