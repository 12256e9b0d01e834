//! Rate Limiting Infrastructure
//!
//! Counting window limiter backed by a [`KeyValueStore`].
//!
//! Each key maps to a JSON array of epoch-millisecond timestamps. On every
//! check the array is pruned to the entries younger than the interval,
//! measured from the request's own timestamp. A full array denies the
//! request without writing; otherwise the timestamp is appended and the
//! array persisted with a TTL of at least one minute.
//!
//! ## Concurrency
//! The check is a plain read-then-write. Two concurrent checks on the same
//! key can both observe the same state and both be allowed, the later write
//! replacing the earlier one. The limit is therefore approximate under
//! contention on a single key.

use std::sync::Arc;
use std::time::Duration;

use crate::kv::{KeyValueStore, KvError};

/// Minimum time-to-live for persisted rate limit records
pub const MIN_RECORD_TTL: Duration = Duration::from_secs(60);

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub burst: u32,
    /// Window length
    pub interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: 10,
            interval: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(burst: u32, interval_secs: u64) -> Self {
        Self {
            burst,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Interval in milliseconds, saturating at `i64::MAX`
    pub fn interval_ms(&self) -> i64 {
        i64::try_from(self.interval.as_millis()).unwrap_or(i64::MAX)
    }

    /// TTL applied when persisting a record: `max(60s, interval)`
    pub fn record_ttl(&self) -> Duration {
        self.interval.max(MIN_RECORD_TTL)
    }
}

/// Rate limiter error
#[derive(Debug, thiserror::Error)]
pub enum RateLimiterError {
    #[error("rate limit store error: {0}")]
    Store(#[from] KvError),

    /// Stored value is not a JSON array of integer timestamps
    #[error("malformed rate limit state for key {key}: {reason}")]
    MalformedState { key: String, reason: String },

    #[error("failed to encode rate limit state: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Persisted state for one rate limit key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub key: String,
    /// Arrival-ordered epoch-millisecond timestamps
    pub timestamps: Vec<i64>,
}

impl RateLimitRecord {
    pub fn empty(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            timestamps: Vec::new(),
        }
    }

    /// Parse a stored value
    pub fn decode(key: &str, raw: &str) -> Result<Self, RateLimiterError> {
        let timestamps: Vec<i64> =
            serde_json::from_str(raw).map_err(|e| RateLimiterError::MalformedState {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            key: key.to_string(),
            timestamps,
        })
    }

    pub fn encode(&self) -> Result<String, RateLimiterError> {
        serde_json::to_string(&self.timestamps).map_err(RateLimiterError::Encode)
    }

    /// Drop timestamps whose window has elapsed relative to `now_ms`
    ///
    /// A timestamp too far in the past to measure against `now_ms` counts
    /// as elapsed.
    pub fn retain_window(&mut self, now_ms: i64, interval_ms: i64) {
        self.timestamps
            .retain(|&t| now_ms.checked_sub(t).is_some_and(|age| age < interval_ms));
    }

    pub fn add(&mut self, timestamp_ms: i64) {
        self.timestamps.push(timestamp_ms);
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Parameters bound to a single check
#[derive(Debug, Clone, Copy)]
pub struct RateLimitCheck<'a> {
    pub key: &'a str,
    pub config: RateLimitConfig,
    /// Instant of the request, supplied by the caller
    pub request_timestamp_ms: i64,
}

/// Counting window rate limiter
pub struct RateLimiter<S> {
    store: Arc<S>,
}

impl<S> Clone for RateLimiter<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> RateLimiter<S>
where
    S: KeyValueStore + Send + Sync,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Check the quota for `check.key`, recording the request when allowed
    ///
    /// ## Returns
    /// * `Ok(true)` - allowed, timestamp persisted
    /// * `Ok(false)` - quota exhausted, store left untouched
    /// * `Err(_)` - store failure or corrupt state
    pub async fn is_allowed(&self, check: &RateLimitCheck<'_>) -> Result<bool, RateLimiterError> {
        let mut record = self.load(check.key).await?;
        record.retain_window(check.request_timestamp_ms, check.config.interval_ms());

        if record.len() >= check.config.burst as usize {
            tracing::debug!(
                key = check.key,
                count = record.len(),
                burst = check.config.burst,
                "Rate limit exhausted"
            );
            return Ok(false);
        }

        record.add(check.request_timestamp_ms);
        self.store
            .put(check.key, record.encode()?, check.config.record_ttl())
            .await?;

        Ok(true)
    }

    async fn load(&self, key: &str) -> Result<RateLimitRecord, RateLimiterError> {
        match self.store.get(key).await? {
            Some(raw) => RateLimitRecord::decode(key, &raw),
            None => Ok(RateLimitRecord::empty(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MapStore {
        values: Mutex<HashMap<String, (String, Duration)>>,
        puts: AtomicUsize,
    }

    impl MapStore {
        fn raw(&self, key: &str) -> Option<String> {
            self.values.lock().unwrap().get(key).map(|(v, _)| v.clone())
        }

        fn ttl(&self, key: &str) -> Option<Duration> {
            self.values.lock().unwrap().get(key).map(|(_, t)| *t)
        }

        fn seed(&self, key: &str, raw: &str) {
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), (raw.to_string(), MIN_RECORD_TTL));
        }
    }

    impl KeyValueStore for MapStore {
        async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
            Ok(self.raw(key))
        }

        async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), KvError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), (value, ttl));
            Ok(())
        }
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, KvError> {
            Err(KvError::backend(std::io::Error::other("connection refused")))
        }

        async fn put(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), KvError> {
            Err(KvError::backend(std::io::Error::other("connection refused")))
        }
    }

    fn check(key: &str, config: RateLimitConfig, at: i64) -> RateLimitCheck<'_> {
        RateLimitCheck {
            key,
            config,
            request_timestamp_ms: at,
        }
    }

    #[tokio::test]
    async fn test_first_request_is_recorded() {
        let store = Arc::new(MapStore::default());
        let limiter = RateLimiter::new(store.clone());
        let config = RateLimitConfig::new(5, 60);

        let allowed = limiter.is_allowed(&check("k", config, 1_000)).await.unwrap();

        assert!(allowed);
        assert_eq!(store.raw("k").as_deref(), Some("[1000]"));
        assert_eq!(store.ttl("k"), Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_burst_then_deny_then_recover() {
        let store = Arc::new(MapStore::default());
        let limiter = RateLimiter::new(store.clone());
        let config = RateLimitConfig::new(5, 60);

        for _ in 0..5 {
            assert!(limiter.is_allowed(&check("k", config, 0)).await.unwrap());
        }
        assert!(!limiter.is_allowed(&check("k", config, 0)).await.unwrap());
        assert!(limiter.is_allowed(&check("k", config, 61_000)).await.unwrap());
        assert_eq!(store.raw("k").as_deref(), Some("[61000]"));
    }

    #[tokio::test]
    async fn test_recovers_one_ms_after_interval() {
        let store = Arc::new(MapStore::default());
        let limiter = RateLimiter::new(store.clone());
        let config = RateLimitConfig::new(1, 10);

        assert!(limiter.is_allowed(&check("k", config, 500)).await.unwrap());
        assert!(!limiter.is_allowed(&check("k", config, 500)).await.unwrap());
        assert!(!limiter.is_allowed(&check("k", config, 10_499)).await.unwrap());
        assert!(limiter.is_allowed(&check("k", config, 10_501)).await.unwrap());
    }

    #[tokio::test]
    async fn test_denied_check_does_not_write() {
        let store = Arc::new(MapStore::default());
        store.seed("k", "[100,200,300]");
        let limiter = RateLimiter::new(store.clone());
        let config = RateLimitConfig::new(3, 60);

        let allowed = limiter.is_allowed(&check("k", config, 400)).await.unwrap();

        assert!(!allowed);
        assert_eq!(store.puts.load(Ordering::SeqCst), 0);
        assert_eq!(store.raw("k").as_deref(), Some("[100,200,300]"));
    }

    #[tokio::test]
    async fn test_expired_timestamps_are_pruned_on_write() {
        let store = Arc::new(MapStore::default());
        store.seed("k", "[0,1000,59000]");
        let limiter = RateLimiter::new(store.clone());
        let config = RateLimitConfig::new(3, 60);

        assert!(limiter.is_allowed(&check("k", config, 60_500)).await.unwrap());
        assert_eq!(store.raw("k").as_deref(), Some("[1000,59000,60500]"));
    }

    #[tokio::test]
    async fn test_long_interval_extends_ttl() {
        let store = Arc::new(MapStore::default());
        let limiter = RateLimiter::new(store.clone());
        let config = RateLimitConfig::new(100, 120);

        limiter.is_allowed(&check("k", config, 0)).await.unwrap();
        assert_eq!(store.ttl("k"), Some(Duration::from_secs(120)));

        let short = RateLimitConfig::new(20, 1);
        limiter.is_allowed(&check("s", short, 0)).await.unwrap();
        assert_eq!(store.ttl("s"), Some(MIN_RECORD_TTL));
    }

    #[tokio::test]
    async fn test_malformed_state_is_an_error() {
        let store = Arc::new(MapStore::default());
        let limiter = RateLimiter::new(store.clone());
        let config = RateLimitConfig::default();

        for raw in [r#"{"a":1}"#, "not json", r#"["x"]"#] {
            store.seed("k", raw);
            let result = limiter.is_allowed(&check("k", config, 0)).await;
            assert!(matches!(
                result,
                Err(RateLimiterError::MalformedState { ref key, .. }) if key == "k"
            ));
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let limiter = RateLimiter::new(Arc::new(BrokenStore));
        let result = limiter
            .is_allowed(&check("k", RateLimitConfig::default(), 0))
            .await;
        assert!(matches!(result, Err(RateLimiterError::Store(_))));
    }

    #[test]
    fn test_record_retain_window() {
        let mut record = RateLimitRecord {
            key: "k".into(),
            timestamps: vec![0, 10, 20, 30],
        };
        record.retain_window(30, 20);
        assert_eq!(record.timestamps, vec![20, 30]);
        assert!(!record.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_timestamp_counts_as_elapsed() {
        let store = Arc::new(MapStore::default());
        store.seed("k", "[-9223372036854775808]");
        let limiter = RateLimiter::new(store.clone());
        let config = RateLimitConfig::new(1, 60);

        let allowed = limiter
            .is_allowed(&check("k", config, 1_700_000_000_000))
            .await
            .unwrap();

        assert!(allowed);
        assert_eq!(store.raw("k").as_deref(), Some("[1700000000000]"));
    }

    #[test]
    fn test_huge_interval_saturates() {
        let config = RateLimitConfig {
            burst: 1,
            interval: Duration::MAX,
        };
        assert_eq!(config.interval_ms(), i64::MAX);

        let mut record = RateLimitRecord {
            key: "k".into(),
            timestamps: vec![0, i64::MIN],
        };
        record.retain_window(1_700_000_000_000, config.interval_ms());
        assert_eq!(record.timestamps, vec![0]);
    }

    #[test]
    fn test_config_helpers() {
        let config = RateLimitConfig::new(5, 90);
        assert_eq!(config.interval_ms(), 90_000);
        assert_eq!(config.record_ttl(), Duration::from_secs(90));
        assert_eq!(RateLimitConfig::new(5, 0).record_ttl(), MIN_RECORD_TTL);
    }
}
