//! Route lookup.
//!
//! # Responsibilities
//! - Store registered routes
//! - Look up the route for a method and path
//! - Distinguish "no such path" from "path exists, wrong method"
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in registration order; first match wins
//! - Explicit errors rather than a silent default route

use axum::http::Method;

use crate::dispatch::error::{DispatchError, DispatchResult};
use crate::routing::matcher::PathParams;
use crate::routing::route::Route;

/// A resolved route plus its path captures.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: PathParams,
}

/// Frozen route table.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        for route in &routes {
            tracing::debug!(
                pattern = %route.pattern().as_str(),
                methods = ?route.methods().methods(),
                handler = route.handler().type_name(),
                "Route registered"
            );
        }
        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the first route matching `method` and `path`.
    pub fn resolve(&self, method: &Method, path: &str) -> DispatchResult<RouteMatch<'_>> {
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.pattern().captures(path) else {
                continue;
            };
            if route.methods().allows(method) {
                return Ok(RouteMatch { route, params });
            }
            for candidate in route.methods().methods() {
                if !allowed.contains(candidate) {
                    allowed.push(candidate.clone());
                }
            }
        }

        if allowed.is_empty() {
            Err(DispatchError::NotFound {
                method: method.clone(),
                path: path.to_string(),
            })
        } else {
            Err(DispatchError::MethodNotAllowed {
                method: method.clone(),
                path: path.to_string(),
                allowed,
            })
        }
    }
}
