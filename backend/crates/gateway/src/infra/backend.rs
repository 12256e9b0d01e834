//! Key-Value Backend Selection
//!
//! The binary picks Postgres when a database is configured and falls back
//! to the in-memory store otherwise.

use std::time::Duration;

use platform::kv::{KeyValueStore, KvError};

use crate::infra::memory::MemoryKeyValueStore;
use crate::infra::postgres::PgKeyValueStore;

/// Key-value store chosen at startup
#[derive(Clone)]
pub enum KvBackend {
    Postgres(PgKeyValueStore),
    Memory(MemoryKeyValueStore),
}

impl KvBackend {
    pub fn name(&self) -> &'static str {
        match self {
            KvBackend::Postgres(_) => "postgres",
            KvBackend::Memory(_) => "memory",
        }
    }
}

impl KeyValueStore for KvBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        match self {
            KvBackend::Postgres(store) => store.get(key).await,
            KvBackend::Memory(store) => store.get(key).await,
        }
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
        match self {
            KvBackend::Postgres(store) => store.put(key, value, ttl).await,
            KvBackend::Memory(store) => store.put(key, value, ttl).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_dispatch() {
        let backend = KvBackend::Memory(MemoryKeyValueStore::default());
        assert_eq!(backend.name(), "memory");

        backend.put("out:u", "[5]".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(backend.get("out:u").await.unwrap().as_deref(), Some("[5]"));
    }
}
