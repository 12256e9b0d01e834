//! Domain Layer - Routing rules and ports
//!
//! This layer contains:
//! - Regions and the inbound-path to upstream-URL rewrite
//! - The endpoint rate limit table
//! - Upstream request/response entities
//! - Port traits for the response cache and upstream client

pub mod endpoint_limits;
pub mod entities;
pub mod region;
pub mod repository;
pub mod route;
