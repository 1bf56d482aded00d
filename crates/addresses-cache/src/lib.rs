//! The counter cache (§2 step 4, §6): a process-external key -> int64
//! store used as the source of truth for running counts so they survive
//! restarts without a full table scan.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("counter cache error: {0}")]
    Redis(#[from] redis::RedisError)
}

/// `GetCount`/`SetCount`/`IncCount` (§6). `get_count` returns `-1` to
/// signal "unset", matching the counter protocol in §4.3.3 exactly so
/// callers can do `if cached == -1 { .. }` the way the upstream does.
#[async_trait]
pub trait CounterCache: Send + Sync {
    async fn get_count(&self, key: &str) -> Result<i64, CacheError>;
    async fn set_count(&self, key: &str, value: i64) -> Result<(), CacheError>;
    /// Atomically increments `key` and returns the post-increment value.
    async fn inc_count(&self, key: &str) -> Result<i64, CacheError>;
}

/// Builds a counter-cache key following the `icon_addresses_<purpose>_<identifier>`
/// scheme (§6).
pub fn cache_key(purpose: &str, identifier: &str) -> String {
    format!("icon_addresses_{purpose}_{identifier}")
}

#[derive(Clone)]
pub struct RedisCounterCache {
    connection: ConnectionManager
}

impl RedisCounterCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_connection_manager().await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl CounterCache for RedisCounterCache {
    async fn get_count(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.connection.clone();
        let value: Option<i64> = conn.get(key).await?;
        Ok(value.unwrap_or(-1))
    }

    async fn set_count(&self, key: &str, value: i64) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        conn.set(key, value).await?;
        Ok(())
    }

    async fn inc_count(&self, key: &str) -> Result<i64, CacheError> {
        let mut conn = self.connection.clone();
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }
}

/// An in-memory [`CounterCache`] for tests and the crate's own unit
/// tests, backed by a mutex-guarded map rather than Redis.
#[derive(Default, Clone)]
pub struct InMemoryCounterCache {
    values: std::sync::Arc<parking_lot::Mutex<std::collections::HashMap<String, i64>>>
}

#[async_trait]
impl CounterCache for InMemoryCounterCache {
    async fn get_count(&self, key: &str) -> Result<i64, CacheError> {
        Ok(*self.values.lock().get(key).unwrap_or(&-1))
    }

    async fn set_count(&self, key: &str, value: i64) -> Result<(), CacheError> {
        self.values.lock().insert(key.to_owned(), value);
        Ok(())
    }

    async fn inc_count(&self, key: &str) -> Result<i64, CacheError> {
        let mut guard = self.values.lock();
        let entry = guard.entry(key.to_owned()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unset_key_reports_negative_one() {
        let cache = InMemoryCounterCache::default();
        assert_eq!(cache.get_count("missing").await.unwrap(), -1);
    }

    #[tokio::test]
    async fn increment_is_monotonic() {
        let cache = InMemoryCounterCache::default();
        assert_eq!(cache.inc_count("k").await.unwrap(), 1);
        assert_eq!(cache.inc_count("k").await.unwrap(), 2);
        assert_eq!(cache.get_count("k").await.unwrap(), 2);
    }

    #[test]
    fn key_scheme_matches_spec() {
        assert_eq!(cache_key("address_count", "all"), "icon_addresses_address_count_all");
    }
}
