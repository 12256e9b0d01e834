//! Presentation Layer
//!
//! The axum handler and router. Every path belongs to the proxy.

pub mod handlers;
pub mod router;
