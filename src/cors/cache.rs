//! Effective policy cache.

use std::sync::Arc;

use dashmap::DashMap;

use crate::cors::merge::merge;
use crate::cors::policy::{CorsPolicy, CrossOrigin};

/// Thread-safe map of `(global, endpoint)` → merged policy.
///
/// Concurrent misses for the same pair may both merge; the results are equal
/// so whichever insert lands last is kept.
#[derive(Clone, Default)]
pub struct CorsPolicyCache {
    inner: Arc<DashMap<(CrossOrigin, CrossOrigin), Arc<CorsPolicy>>>,
}

impl CorsPolicyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the effective policy for the pair, merging on first use.
    pub fn effective(&self, global: &CrossOrigin, endpoint: &CrossOrigin) -> Arc<CorsPolicy> {
        let key = (global.clone(), endpoint.clone());
        if let Some(hit) = self.inner.get(&key) {
            return hit.value().clone();
        }

        let policy = Arc::new(merge(global, endpoint));
        self.inner.insert(key, policy.clone());
        tracing::trace!(cached = self.inner.len(), "Merged CORS policy");
        policy
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
