//! Two-tier catalog cache
//!
//! A short-TTL in-memory tier fronts the durable SQLite tier. Reads fall
//! through memory → durable and re-seed the memory tier on a durable hit;
//! writes go to both. Durable-tier failures degrade to a miss rather than
//! failing the caller, since every cache entry is an idempotent derivation
//! of catalog state.

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::db;

/// TTL applied to in-memory entries regardless of the durable TTL
const MEMORY_TTL: Duration = Duration::from_secs(5 * 60);

/// String-keyed JSON cache
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn put(&self, key: &str, value: String, ttl: Duration);
}

/// Volatile in-memory tier
pub struct MemoryCache {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

struct MemoryEntry {
    payload: String,
    expires_at: Instant,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.payload.clone())
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                payload: value,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

/// Durable SQLite-backed tier; errors are logged and treated as misses
pub struct DurableCache {
    pool: SqlitePool,
}

impl DurableCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Cache for DurableCache {
    async fn get(&self, key: &str) -> Option<String> {
        match db::cache::cache_get(&self.pool, key).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(cache_key = %key, error = %e, "Durable cache read failed");
                None
            }
        }
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::zero());
        if let Err(e) = db::cache::cache_put(&self.pool, key, &value, ttl).await {
            tracing::warn!(cache_key = %key, error = %e, "Durable cache write failed");
        }
    }
}

/// Read-through/write-through composition of the two tiers
pub struct TieredCache {
    fast: Arc<dyn Cache>,
    durable: Arc<dyn Cache>,
}

impl TieredCache {
    pub fn new(fast: Arc<dyn Cache>, durable: Arc<dyn Cache>) -> Self {
        Self { fast, durable }
    }
}

#[async_trait]
impl Cache for TieredCache {
    async fn get(&self, key: &str) -> Option<String> {
        if let Some(payload) = self.fast.get(key).await {
            return Some(payload);
        }

        let payload = self.durable.get(key).await?;
        self.fast.put(key, payload.clone(), MEMORY_TTL).await;
        Some(payload)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) {
        self.fast.put(key, value.clone(), MEMORY_TTL.min(ttl)).await;
        self.durable.put(key, value, ttl).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_cache_expires() {
        let cache = MemoryCache::new();
        cache
            .put("k", "v".to_string(), Duration::from_millis(20))
            .await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn tiered_cache_reseeds_fast_tier() {
        let fast = Arc::new(MemoryCache::new());
        let durable = Arc::new(MemoryCache::new());
        durable
            .put("k", "v".to_string(), Duration::from_secs(60))
            .await;

        let tiered = TieredCache::new(fast.clone(), durable);
        assert_eq!(tiered.get("k").await.as_deref(), Some("v"));

        // Hit landed in the fast tier on the way out
        assert_eq!(fast.get("k").await.as_deref(), Some("v"));
    }
}
