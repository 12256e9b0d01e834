//! Key-Value Store Port
//!
//! Minimal string key-value interface with per-write time-to-live.
//! Backends live in feature crates (Postgres, in-memory).

use std::time::Duration;

/// Error raised by a key-value backend
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// The backend could not be reached or rejected the operation
    #[error("key-value store unavailable: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl KvError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        KvError::Backend(Box::new(err))
    }
}

/// Eventually-consistent key-value store
///
/// No compare-and-swap is offered: callers doing read-modify-write
/// must tolerate lost updates under concurrency.
#[trait_variant::make(KeyValueStore: Send)]
pub trait LocalKeyValueStore {
    /// Read the value for `key`, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Write `value` under `key`, expiring after `ttl`
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError>;
}
