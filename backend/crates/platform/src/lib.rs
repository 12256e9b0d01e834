//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Key-value store port
//! - Counting window rate limiter over that port
//! - Trusted client address extraction
//! - Background task tracking for post-response work

pub mod background;
pub mod client;
pub mod kv;
pub mod rate_limit;
