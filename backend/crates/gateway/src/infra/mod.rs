//! Infrastructure Layer
//!
//! Storage and upstream implementations of the domain ports.

pub mod backend;
pub mod http;
pub mod memory;
pub mod postgres;
