//! PostgreSQL Key-Value Store
//!
//! Shared rate limit state for several gateway instances. Expired rows are
//! invisible to reads and removed by `cleanup_expired`.

use std::time::Duration;

use chrono::Utc;
use platform::kv::{KeyValueStore, KvError};
use sqlx::PgPool;

/// PostgreSQL-backed key-value store
#[derive(Clone)]
pub struct PgKeyValueStore {
    pool: PgPool,
}

impl PgKeyValueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete rows whose TTL has passed
    pub async fn cleanup_expired(&self) -> Result<u64, KvError> {
        let now_ms = Utc::now().timestamp_millis();

        let deleted = sqlx::query("DELETE FROM gateway_kv WHERE expires_at_ms <= $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await
            .map_err(KvError::backend)?
            .rows_affected();

        tracing::info!(rows = deleted, "Cleaned up expired gateway state");

        Ok(deleted)
    }
}

impl KeyValueStore for PgKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let now_ms = Utc::now().timestamp_millis();

        sqlx::query_scalar::<_, String>(
            r#"
            SELECT kv_value
            FROM gateway_kv
            WHERE kv_key = $1 AND expires_at_ms > $2
            "#,
        )
        .bind(key)
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await
        .map_err(KvError::backend)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at_ms = Utc::now().timestamp_millis().saturating_add(ttl_ms);

        sqlx::query(
            r#"
            INSERT INTO gateway_kv (kv_key, kv_value, expires_at_ms)
            VALUES ($1, $2, $3)
            ON CONFLICT (kv_key)
            DO UPDATE SET
                kv_value = EXCLUDED.kv_value,
                expires_at_ms = EXCLUDED.expires_at_ms
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at_ms)
        .execute(&self.pool)
        .await
        .map_err(KvError::backend)?;

        Ok(())
    }
}
