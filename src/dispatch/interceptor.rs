//! Interceptor chain.
//!
//! # Execution Order
//! ```text
//! before: A → B → C → handler
//! after:            C → B → A   (only those whose before returned true)
//! ```
//!
//! # Design Decisions
//! - First `false` from `before_execute` short-circuits: no later hooks, no handler
//! - After hooks unwind on every exit path, success or error
//! - Hook errors are returned to the dispatcher, never swallowed

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{request::Parts, Response},
};

use crate::dispatch::error::{DispatchError, DispatchResult};

/// Hooks around handler execution.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Return `Ok(false)` to stop dispatch and send `response` as it is.
    ///
    /// Only the request head is visible; the body belongs to the handler.
    async fn before_execute(
        &self,
        request: &Parts,
        response: &mut Response<Body>,
    ) -> DispatchResult<bool>;

    async fn after_execute(
        &self,
        _request: &Parts,
        _response: &mut Response<Body>,
    ) -> DispatchResult<()> {
        Ok(())
    }
}

/// Result of running the before hooks.
#[derive(Debug)]
pub struct BeforeOutcome {
    /// Number of leading interceptors whose before hook returned true.
    pub passed: usize,
    /// `Ok(true)` when every hook let the request through.
    pub result: DispatchResult<bool>,
}

/// Ordered list of interceptors.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self { interceptors }
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run before hooks in registration order until one declines or fails.
    pub async fn apply_before(
        &self,
        request: &Parts,
        response: &mut Response<Body>,
    ) -> BeforeOutcome {
        let mut passed = 0;
        for interceptor in &self.interceptors {
            match interceptor.before_execute(request, response).await {
                Ok(true) => passed += 1,
                Ok(false) => {
                    tracing::debug!(passed, "Interceptor stopped dispatch");
                    return BeforeOutcome {
                        passed,
                        result: Ok(false),
                    };
                }
                Err(e) => {
                    return BeforeOutcome {
                        passed,
                        result: Err(e),
                    };
                }
            }
        }
        BeforeOutcome {
            passed,
            result: Ok(true),
        }
    }

    /// Run after hooks of the first `passed` interceptors in reverse order.
    ///
    /// Every hook runs even if an earlier one failed; the first error wins.
    pub async fn apply_after(
        &self,
        passed: usize,
        request: &Parts,
        response: &mut Response<Body>,
    ) -> DispatchResult<()> {
        let mut first_error: Option<DispatchError> = None;
        for interceptor in self.interceptors[..passed.min(self.interceptors.len())]
            .iter()
            .rev()
        {
            if let Err(e) = interceptor.after_execute(request, response).await {
                tracing::warn!(error = %e, "Interceptor after hook failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
