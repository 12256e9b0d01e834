//! Regional API Gateway
//!
//! Reverse proxy in front of a regional third-party HTTP API. Each request
//! is routed to a regional host, checked against a per-client quota and a
//! per-upstream-URL quota, then served from the response cache or fetched
//! upstream with the API key injected.
//!
//! Clean Architecture structure:
//! - `domain/` - Regions, routing, endpoint limits, port traits
//! - `application/` - Configuration and the request pipeline
//! - `infra/` - Postgres and in-memory stores, upstream HTTP client
//! - `presentation/` - HTTP handler and router

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::GatewayConfig;
pub use domain::endpoint_limits::{EndpointLimitError, EndpointLimitTable};
pub use domain::region::Region;
pub use error::{GatewayError, GatewayResult};
pub use infra::backend::KvBackend;
pub use infra::http::ReqwestUpstreamClient;
pub use infra::memory::{MemoryKeyValueStore, MemoryResponseCache};
pub use infra::postgres::PgKeyValueStore;
pub use presentation::router::gateway_router;
