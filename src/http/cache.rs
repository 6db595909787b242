//! HTTP cache control helpers
//!
//! ETag generation, `If-None-Match` evaluation, and `Cache-Control` policy
//! rendering. The site hooks use [`CachePolicy`] to decide the cache header
//! per path; the static handler uses ETags for conditional responses.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Generate an `ETag` from response content using a fast content hash
///
/// Returns the quoted form, e.g. `"9f86d08c"`.
#[must_use]
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}\"", hasher.finish())
}

/// Evaluate a client `If-None-Match` header against the server's `ETag`
///
/// Handles comma-separated lists and the `*` wildcard. Returns true when
/// the response should be 304 Not Modified.
#[must_use]
pub fn etag_matches(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client| {
        client
            .split(',')
            .map(str::trim)
            .any(|candidate| candidate == etag || candidate == "*")
    })
}

/// Cache control policy for a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Public cache with max-age in seconds
    Public(u32),
    /// Private (browser-only) cache with max-age in seconds
    Private(u32),
    /// Revalidate every time
    NoCache,
    /// Never store
    NoStore,
}

impl CachePolicy {
    /// Render as a `Cache-Control` header value
    #[must_use]
    pub fn header_value(self) -> String {
        match self {
            Self::Public(max_age) => format!("public, max-age={max_age}"),
            Self::Private(max_age) => format!("private, max-age={max_age}"),
            Self::NoCache => "no-cache".to_string(),
            Self::NoStore => "no-store".to_string(),
        }
    }
}
