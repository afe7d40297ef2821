//! Rerank result caching.
//!
//! ```ascii
//! RerankService ──► ResultCache ──► dyn KeyValueStore
//!                   │  best effort     ├── MemoryStore  (in-process, TTL + eviction)
//!                   │  bounded I/O     └── FailingStore (always errors, for tests)
//!                   └─ JSON RankedResult
//! ```
//!
//! The store is opaque: `get(key)` and `put(key, value, ttl)`. Store errors,
//! timeouts and undecodable values are all treated as a miss on read and a
//! no-op on write. Nothing in this module fails a request.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::{RerankError, Result};
use crate::reranker::RankedResult;

/// An external key-value store with per-entry expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value for `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key` for `ttl`.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    created_at: Instant,
    ttl: Duration,
    access_count: usize,
}

impl CacheEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
            access_count: 0,
        }
    }

    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }

    fn access(&mut self) -> String {
        self.access_count += 1;
        self.value.clone()
    }
}

/// Store statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    /// Current number of entries.
    pub entries: usize,
    /// Entries removed by expiry or capacity.
    pub evictions: usize,
}

impl CacheStats {
    /// Get the cache hit rate.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// In-memory TTL store, bounded by entry count.
///
/// At capacity the least-used entry (fewest reads, then oldest) is evicted.
/// Expired entries are dropped on the next read of their key.
pub struct MemoryStore {
    max_entries: usize,
    entries: RwLock<HashMap<String, CacheEntry>>,
    stats: RwLock<CacheStats>,
}

impl MemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Get store statistics.
    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let stats = self.stats.read().await;
        CacheStats {
            entries: entries.len(),
            ..stats.clone()
        }
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let mut stats = self.stats.write().await;
        stats.evictions += entries.len();
        entries.clear();
    }

    async fn evict_least_used(&self, entries: &mut HashMap<String, CacheEntry>) {
        if let Some(key) = entries
            .iter()
            .min_by_key(|(_, entry)| (entry.access_count, entry.created_at))
            .map(|(k, _)| k.clone())
        {
            entries.remove(&key);
            self.stats.write().await.evictions += 1;
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.write().await;

        if let Some(entry) = entries.get_mut(key) {
            if entry.is_expired() {
                entries.remove(key);
                let mut stats = self.stats.write().await;
                stats.misses += 1;
                stats.evictions += 1;
                return Ok(None);
            }

            self.stats.write().await.hits += 1;
            return Ok(Some(entry.access()));
        }

        self.stats.write().await.misses += 1;
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            self.evict_least_used(&mut entries).await;
        }

        entries.insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }
}

/// Store whose every operation fails.
#[derive(Debug, Clone, Default)]
pub struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(RerankError::Cache("store unavailable".to_string()))
    }

    async fn put(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        Err(RerankError::Cache("store unavailable".to_string()))
    }
}

/// Best-effort read-through / write-through cache of full ranked results.
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    timeout: Duration,
    enabled: bool,
}

impl ResultCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            timeout: Duration::from_millis(500),
            enabled: true,
        }
    }

    /// Build from the `[cache]` section.
    pub fn from_config(store: Arc<dyn KeyValueStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(config.ttl_secs),
            timeout: Duration::from_millis(config.timeout_ms),
            enabled: config.enabled,
        }
    }

    /// Upper bound on one store call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached result for `key`, marked `cached = true`.
    pub async fn get(&self, key: &str) -> Option<RankedResult> {
        if !self.enabled {
            return None;
        }

        let raw = match tokio::time::timeout(self.timeout, self.store.get(key)).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => {
                debug!(key = %key, "cache miss");
                return None;
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "cache read failed, treating as miss");
                return None;
            }
            Err(_) => {
                warn!(key = %key, "cache read timed out, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<RankedResult>(&raw) {
            Ok(mut result) => {
                debug!(key = %key, items = result.items.len(), "cache hit");
                result.cached = true;
                Some(result)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cached value undecodable, treating as miss");
                None
            }
        }
    }

    /// Store the full result under `key`. Failures are logged and dropped.
    pub async fn put(&self, key: &str, result: &RankedResult) {
        if !self.enabled {
            return;
        }

        let mut stored = result.clone();
        stored.cached = false;
        let value = match serde_json::to_string(&stored) {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %key, error = %e, "failed to encode result for cache");
                return;
            }
        };

        match tokio::time::timeout(self.timeout, self.store.put(key, value, self.ttl)).await {
            Ok(Ok(())) => debug!(key = %key, items = result.items.len(), "cache write"),
            Ok(Err(e)) => warn!(key = %key, error = %e, "cache write failed"),
            Err(_) => warn!(key = %key, "cache write timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reranker::{Item, RerankMode, ScoreTrace};

    fn ranked() -> RankedResult {
        let mut item = Item::new("a", "content");
        item.final_score = Some(0.5);
        item.length = Some(7);
        RankedResult::new(vec![item], RerankMode::Math)
    }

    #[tokio::test]
    async fn test_memory_store_get_put() {
        let store = MemoryStore::new(10);
        assert_eq!(store.get("k").await.unwrap(), None);

        store
            .put("k", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));

        let stats = store.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate() - 0.5).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_ttl_expiry() {
        let store = MemoryStore::new(10);
        store
            .put("k", "v".to_string(), Duration::from_secs(5))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(store.get("k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get("k").await.unwrap().is_none());
        assert_eq!(store.stats().await.evictions, 1);
        assert_eq!(store.stats().await.entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_store_evicts_least_used() {
        let store = MemoryStore::new(2);
        let ttl = Duration::from_secs(60);
        store.put("a", "1".to_string(), ttl).await.unwrap();
        tokio::time::advance(Duration::from_millis(10)).await;
        store.put("b", "2".to_string(), ttl).await.unwrap();
        store.get("a").await.unwrap();

        store.put("c", "3".to_string(), ttl).await.unwrap();

        assert!(store.get("a").await.unwrap().is_some());
        assert!(store.get("b").await.unwrap().is_none());
        assert!(store.get("c").await.unwrap().is_some());
        assert_eq!(store.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_memory_store_overwrite_does_not_evict() {
        let store = MemoryStore::new(1);
        let ttl = Duration::from_secs(60);
        store.put("a", "1".to_string(), ttl).await.unwrap();
        store.put("a", "2".to_string(), ttl).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("2".to_string()));
        assert_eq!(store.stats().await.evictions, 0);
    }

    #[tokio::test]
    async fn test_memory_store_clear() {
        let store = MemoryStore::new(10);
        store
            .put("a", "1".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        store.clear().await;
        assert_eq!(store.stats().await.entries, 0);
        assert_eq!(store.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_result_cache_round_trip_marks_cached() {
        let cache = ResultCache::new(Arc::new(MemoryStore::new(10)), Duration::from_secs(60));
        assert!(cache.get("k").await.is_none());

        let mut result = ranked();
        result.cached = true;
        cache.put("k", &result).await;

        let hit = cache.get("k").await.unwrap();
        assert!(hit.cached);
        assert_eq!(hit.items, ranked().items);
        assert_eq!(hit.method, RerankMode::Math);
    }

    #[tokio::test]
    async fn test_result_cache_preserves_scores_bit_for_bit() {
        let cache = ResultCache::new(Arc::new(MemoryStore::new(10)), Duration::from_secs(60));

        let scores: Vec<f64> = std::iter::once(0.49637051671732524)
            .chain((1..2000).map(|i| (i as f64 * 0.618_033_988_749_895).fract() / 3.0_f64.sqrt()))
            .collect();
        let items: Vec<Item> = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| {
                let mut item = Item::new(format!("id-{i}"), "content");
                item.final_score = Some(score);
                item.scores = Some(ScoreTrace {
                    vector_score: score / 7.0,
                    string_score: 1.0 - score,
                    fuzzy_score: score * score,
                    keyword_score: score * 13.37,
                    final_score: score,
                    ..Default::default()
                });
                item
            })
            .collect();
        let result = RankedResult::new(items, RerankMode::Math);
        cache.put("k", &result).await;

        let hit = cache.get("k").await.unwrap();
        for (cached, computed) in hit.items.iter().zip(&result.items) {
            assert_eq!(
                cached.final_score.map(f64::to_bits),
                computed.final_score.map(f64::to_bits),
                "{:?} vs {:?}",
                cached.final_score,
                computed.final_score
            );
            assert_eq!(cached.scores, computed.scores);
        }
        assert_eq!(hit.items.len(), scores.len());
    }

    #[tokio::test]
    async fn test_result_cache_swallows_store_errors() {
        let cache = ResultCache::new(Arc::new(FailingStore), Duration::from_secs(60));
        cache.put("k", &ranked()).await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_result_cache_undecodable_value_is_miss() {
        let store = Arc::new(MemoryStore::new(10));
        store
            .put("k", "not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        let cache = ResultCache::new(store, Duration::from_secs(60));
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_result_cache_disabled() {
        let store = Arc::new(MemoryStore::new(10));
        let cache = ResultCache::new(store.clone(), Duration::from_secs(60)).with_enabled(false);
        cache.put("k", &ranked()).await;
        assert!(cache.get("k").await.is_none());
        assert_eq!(store.stats().await.entries, 0);
    }

    struct SlowStore;

    #[async_trait]
    impl KeyValueStore for SlowStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(None)
        }

        async fn put(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_cache_timeout_is_miss() {
        let cache = ResultCache::new(Arc::new(SlowStore), Duration::from_secs(60))
            .with_timeout(Duration::from_millis(50));
        cache.put("k", &ranked()).await;
        assert!(cache.get("k").await.is_none());
    }
}
