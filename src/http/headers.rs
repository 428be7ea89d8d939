//! Hop-by-hop header classification.
//!
//! # Responsibilities
//! - Decide whether a header belongs to a single connection leg
//! - Copy header maps across the proxy boundary without those headers
//!
//! # Design Decisions
//! - Fixed set, case-insensitive exact match
//! - `Connection` tokens are not expanded into extra names

use axum::http::HeaderMap;

/// Headers that must never be forwarded by an intermediary.
pub const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "host",
    "content-length",
    "transfer-encoding",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "te",
    "trailer",
    "upgrade",
];

/// Returns true if `name` is a hop-by-hop header.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|hop| hop.eq_ignore_ascii_case(name))
}

/// Append every end-to-end header of `source` onto `target`.
///
/// Multi-valued headers keep all of their values, in order.
pub fn copy_end_to_end(source: &HeaderMap, target: &mut HeaderMap) {
    for (name, value) in source.iter() {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        target.append(name.clone(), value.clone());
    }
}
