//! Port Traits
//!
//! Interfaces for the response cache and the upstream API.
//! Implementations are in the infrastructure layer.

use crate::domain::entities::{UpstreamRequest, UpstreamResponse};

/// Response cache error
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("response cache unavailable: {0}")]
    Backend(String),
}

/// Upstream call error
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Connection, TLS or protocol failure before a response arrived
    #[error("error fetching data from upstream API: {0}")]
    Transport(String),

    /// Response started but the body could not be read
    #[error("error reading upstream response body: {0}")]
    Body(String),
}

/// Shared response cache keyed by the full upstream URL
#[trait_variant::make(ResponseCache: Send)]
pub trait LocalResponseCache {
    /// Cached response for `url`, if any
    async fn lookup(&self, url: &str) -> Result<Option<UpstreamResponse>, CacheError>;

    /// Store `response` under `url`
    async fn store(&self, url: &str, response: UpstreamResponse) -> Result<(), CacheError>;
}

/// Upstream HTTP API
#[trait_variant::make(UpstreamClient: Send)]
pub trait LocalUpstreamClient {
    /// Send the request and buffer the whole response
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}
