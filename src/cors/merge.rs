//! Merging of global and endpoint cross-origin policies.
//!
//! # Rules
//! - List fields: case-insensitive union, order not significant
//! - `value` is accepted as an alias of `origins` on both sides
//! - `allow_credentials`: endpoint, then global, then `true`
//! - `max_age`: endpoint if >= 0, then global if >= 0, then 1800

use std::collections::HashSet;

use crate::cors::policy::{CorsPolicy, CrossOrigin, DEFAULT_MAX_AGE_SECS};

/// Combine two policy scopes into the effective policy.
pub fn merge(global: &CrossOrigin, endpoint: &CrossOrigin) -> CorsPolicy {
    CorsPolicy {
        origins: union_ignore_case([
            &global.origins,
            &global.value,
            &endpoint.origins,
            &endpoint.value,
        ]),
        allowed_headers: union_ignore_case([&global.allowed_headers, &endpoint.allowed_headers]),
        exposed_headers: union_ignore_case([&global.exposed_headers, &endpoint.exposed_headers]),
        methods: union_ignore_case([&global.methods, &endpoint.methods]),
        allow_credentials: endpoint
            .allow_credentials
            .or(global.allow_credentials)
            .unwrap_or(true),
        max_age: [endpoint.max_age, global.max_age]
            .into_iter()
            .find(|age| *age >= 0)
            .map(|age| age as u64)
            .unwrap_or(DEFAULT_MAX_AGE_SECS),
    }
}

impl From<&CorsPolicy> for CrossOrigin {
    fn from(policy: &CorsPolicy) -> Self {
        CrossOrigin {
            value: Vec::new(),
            origins: policy.origins.clone(),
            allowed_headers: policy.allowed_headers.clone(),
            exposed_headers: policy.exposed_headers.clone(),
            methods: policy.methods.clone(),
            allow_credentials: Some(policy.allow_credentials),
            max_age: policy.max_age as i64,
        }
    }
}

/// First spelling of each case-insensitive entry, sorted case-insensitively.
fn union_ignore_case<const N: usize>(sides: [&Vec<String>; N]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged: Vec<String> = sides
        .into_iter()
        .flatten()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty() && seen.insert(item.to_ascii_lowercase()))
        .map(str::to_string)
        .collect();
    merged.sort_by_cached_key(|item| item.to_ascii_lowercase());
    merged
}
