//! Domain Entities
//!
//! Request and response shapes exchanged with the upstream API and the
//! response cache.

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use std::fmt;
use std::time::Duration;

/// Response header marking cache provenance
pub const X_FROM_CACHE: &str = "x-from-cache";

/// Request forwarded to the upstream API
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Fully buffered upstream response
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Value of `X-From-Cache`, if set
    pub fn from_cache(&self) -> Option<bool> {
        self.headers
            .get(X_FROM_CACHE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "true")
    }

    /// Stamp `Cache-Control` and `X-From-Cache` on the response
    pub fn mark_cached(&mut self, max_age: Duration, from_cache: bool) {
        let cache_control = format!("public, max-age={}", max_age.as_secs());
        if let Ok(value) = HeaderValue::from_str(&cache_control) {
            self.headers.insert(header::CACHE_CONTROL, value);
        }
        self.headers.insert(
            X_FROM_CACHE,
            HeaderValue::from_static(if from_cache { "true" } else { "false" }),
        );
    }
}

/// Which quota denied a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitTier {
    /// Per client address and upstream URL
    Client,
    /// Per upstream URL, shared by all clients
    Server,
}

impl LimitTier {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LimitTier::Client => "client",
            LimitTier::Server => "server",
        }
    }
}

impl fmt::Display for LimitTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
