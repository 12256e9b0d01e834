//! In-Memory Implementations (moka)
//!
//! Single-process key-value store and response cache. Suitable for one
//! gateway instance; several instances need the Postgres store to share
//! quotas.

use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use platform::kv::{KeyValueStore, KvError};

use crate::domain::entities::UpstreamResponse;
use crate::domain::repository::{CacheError, ResponseCache};

const DEFAULT_KV_CAPACITY: u64 = 100_000;

#[derive(Clone)]
struct KvEntry {
    value: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with
struct KvExpiry;

impl Expiry<String, KvEntry> for KvExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &KvEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &KvEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory key-value store with per-entry TTL
#[derive(Clone)]
pub struct MemoryKeyValueStore {
    entries: Cache<String, KvEntry>,
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new(DEFAULT_KV_CAPACITY)
    }
}

impl MemoryKeyValueStore {
    pub fn new(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(KvExpiry)
            .build();

        Self { entries }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.get(key).await.map(|entry| entry.value))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
        self.entries
            .insert(key.to_string(), KvEntry { value, ttl })
            .await;
        Ok(())
    }
}

/// In-memory response cache; every entry lives for the configured max-age
#[derive(Clone)]
pub struct MemoryResponseCache {
    responses: Cache<String, UpstreamResponse>,
}

impl MemoryResponseCache {
    pub fn new(max_entries: u64, max_age: Duration) -> Self {
        let responses = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(max_age)
            .build();

        Self { responses }
    }

    pub fn entry_count(&self) -> u64 {
        self.responses.entry_count()
    }
}

impl ResponseCache for MemoryResponseCache {
    async fn lookup(&self, url: &str) -> Result<Option<UpstreamResponse>, CacheError> {
        Ok(self.responses.get(url).await)
    }

    async fn store(&self, url: &str, response: UpstreamResponse) -> Result<(), CacheError> {
        self.responses.insert(url.to_string(), response).await;
        tracing::debug!(url = %url, "Cached upstream response");
        Ok(())
    }
}
