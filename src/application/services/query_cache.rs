//! Cached reads with topic-based invalidation.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace, warn};

use crate::domain::entities::Topic;
use crate::domain::errors::ApiError;

pub const DEFAULT_CACHE_CAPACITY: usize = 256;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const RETRY_DELAY_BASE: Duration = Duration::from_secs(1);
const RETRY_DELAY_MAX: Duration = Duration::from_secs(30);

/// Identifies one cached read: its topic plus the parameters it was made with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub topic: Topic,
    pub params: String,
}

impl QueryKey {
    #[must_use]
    pub fn new(topic: Topic, params: impl Into<String>) -> Self {
        Self {
            topic,
            params: params.into(),
        }
    }

    #[must_use]
    pub fn topic(topic: Topic) -> Self {
        Self::new(topic, "")
    }
}

struct CacheEntry {
    value: Value,
    fetched_at: Instant,
    stale: bool,
}

impl CacheEntry {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.stale && self.fetched_at.elapsed() < stale_time
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidated: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    pub size: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} queries, {:.1}% hit rate ({} hits, {} misses, {} invalidated)",
            self.size, self.hit_rate, self.hits, self.misses, self.invalidated
        )
    }
}

/// LRU of JSON query results.
///
/// A read is served from the cache while it is younger than its stale time and
/// no invalidation touched its topic. Anything else re-fetches.
pub struct QueryCache {
    entries: Mutex<LruCache<QueryKey, CacheEntry>>,
    max_retries: u32,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidated: AtomicU64,
}

impl QueryCache {
    #[must_use]
    pub fn new(capacity: usize, max_retries: u32) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(cap)),
            max_retries,
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            invalidated: AtomicU64::new(0),
        }
    }

    /// Returns a fresh cached value or runs `fetch`, retrying failures that
    /// [`ApiError::should_retry`] allows.
    ///
    /// # Errors
    /// Returns the last fetch error once retries are exhausted, or
    /// `ApiError::Serialization` if the value cannot be cached as JSON.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        key: QueryKey,
        stale_time: Duration,
        fetch: F,
    ) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(value) = self.fresh_value(&key, stale_time) {
            match serde_json::from_value(value) {
                Ok(cached) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(topic = %key.topic, params = %key.params, "Query cache hit");
                    return Ok(cached);
                }
                Err(e) => {
                    warn!(error = %e, topic = %key.topic, "Cached value has unexpected shape");
                    self.entries.lock().pop(&key);
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(topic = %key.topic, params = %key.params, "Query cache miss");

        let generation = self.generation.load(Ordering::SeqCst);
        let fetched = self.fetch_with_retry(&key, fetch).await?;
        let value =
            serde_json::to_value(&fetched).map_err(|e| ApiError::serialization(e.to_string()))?;

        // An invalidation that raced the fetch leaves the result stale.
        let stale = self.generation.load(Ordering::SeqCst) != generation;
        self.entries.lock().put(
            key,
            CacheEntry {
                value,
                fetched_at: Instant::now(),
                stale,
            },
        );

        Ok(fetched)
    }

    async fn fetch_with_retry<T, F, Fut>(&self, key: &QueryKey, fetch: F) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt: u32 = 0;

        loop {
            match fetch().await {
                Ok(value) => return Ok(value),
                Err(e) if e.should_retry() && attempt < self.max_retries => {
                    let delay = retry_delay(attempt);
                    attempt += 1;
                    warn!(error = %e, topic = %key.topic, attempt, delay = ?delay, "Query failed, retrying");
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn fresh_value(&self, key: &QueryKey, stale_time: Duration) -> Option<Value> {
        let mut entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(stale_time))
            .map(|entry| entry.value.clone())
    }

    /// Marks every read under `topic` stale. Returns how many were affected.
    pub fn invalidate_topic(&self, topic: &Topic) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut count = 0;
        for (key, entry) in self.entries.lock().iter_mut() {
            if key.topic == *topic && !entry.stale {
                entry.stale = true;
                count += 1;
            }
        }

        self.invalidated.fetch_add(count as u64, Ordering::Relaxed);
        debug!(topic = %topic, count, "Invalidated cached queries");
        count
    }

    /// Marks every cached read stale.
    pub fn invalidate_all(&self) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let mut count = 0;
        for (_, entry) in self.entries.lock().iter_mut() {
            if !entry.stale {
                entry.stale = true;
                count += 1;
            }
        }

        self.invalidated.fetch_add(count as u64, Ordering::Relaxed);
        debug!(count, "Invalidated all cached queries");
        count
    }

    /// Returns whether `key` would be served without fetching.
    #[must_use]
    pub fn is_fresh(&self, key: &QueryKey, stale_time: Duration) -> bool {
        self.entries
            .lock()
            .peek(key)
            .is_some_and(|entry| entry.is_fresh(stale_time))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits,
            misses,
            invalidated: self.invalidated.load(Ordering::Relaxed),
            hit_rate,
            size: self.len(),
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_RETRIES)
    }
}

fn retry_delay(attempt: u32) -> Duration {
    RETRY_DELAY_BASE
        .saturating_mul(2_u32.saturating_pow(attempt))
        .min(RETRY_DELAY_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{AuthError, NormalizedError, RefreshError, TransportError};
    use std::sync::atomic::AtomicUsize;

    const STALE: Duration = Duration::from_secs(120);

    fn counted(calls: &AtomicUsize) -> impl Fn() -> std::future::Ready<Result<Vec<u32>, ApiError>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(vec![u32::try_from(n).unwrap()]))
        }
    }

    #[tokio::test]
    async fn test_fresh_read_is_served_from_cache() {
        let cache = QueryCache::default();
        let calls = AtomicUsize::new(0);
        let key = QueryKey::topic(Topic::STOCK);

        let first: Vec<u32> = cache.get_or_fetch(key.clone(), STALE, counted(&calls)).await.unwrap();
        let second: Vec<u32> = cache.get_or_fetch(key, STALE, counted(&calls)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_invalidated_topic_refetches() {
        let cache = QueryCache::default();
        let calls = AtomicUsize::new(0);
        let stock = QueryKey::new(Topic::STOCK, "department_id=1");
        let departments = QueryKey::topic(Topic::DEPARTMENTS);

        let _: Vec<u32> = cache.get_or_fetch(stock.clone(), STALE, counted(&calls)).await.unwrap();
        let _: Vec<u32> = cache
            .get_or_fetch(departments.clone(), STALE, counted(&calls))
            .await
            .unwrap();

        assert_eq!(cache.invalidate_topic(&Topic::STOCK), 1);
        assert!(!cache.is_fresh(&stock, STALE));
        assert!(cache.is_fresh(&departments, STALE));

        let refetched: Vec<u32> = cache.get_or_fetch(stock, STALE, counted(&calls)).await.unwrap();
        assert_eq!(refetched, vec![2]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_goes_stale_with_time() {
        let cache = QueryCache::default();
        let calls = AtomicUsize::new(0);
        let key = QueryKey::topic(Topic::EQUIPMENT);

        let _: Vec<u32> = cache.get_or_fetch(key.clone(), STALE, counted(&calls)).await.unwrap();
        tokio::time::advance(STALE + Duration::from_secs(1)).await;

        assert!(!cache.is_fresh(&key, STALE));
        let _: Vec<u32> = cache.get_or_fetch(key, STALE, counted(&calls)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = QueryCache::default();
        let calls = AtomicUsize::new(0);

        for topic in [Topic::STOCK, Topic::USERS, Topic::AUDIT_LOGS] {
            let _: Vec<u32> = cache
                .get_or_fetch(QueryKey::topic(topic), STALE, counted(&calls))
                .await
                .unwrap();
        }

        assert_eq!(cache.invalidate_all(), 3);
        assert_eq!(cache.invalidate_all(), 0);
        assert_eq!(cache.stats().invalidated, 3);
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_are_retried() {
        let cache = QueryCache::new(8, 3);
        let calls = AtomicUsize::new(0);

        let result: Vec<u32> = cache
            .get_or_fetch(QueryKey::topic(Topic::USERS), STALE, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(NormalizedError::from_response(503, "Service Unavailable", b"").into())
                    } else {
                        Ok(vec![7])
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, vec![7]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let cache = QueryCache::new(8, 2);
        let calls = AtomicUsize::new(0);

        let err = cache
            .get_or_fetch::<Vec<u32>, _, _>(QueryKey::topic(Topic::USERS), STALE, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TransportError::connect("refused").into()) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_client_and_auth_errors_not_retried() {
        let cache = QueryCache::default();
        let calls = AtomicUsize::new(0);

        let _ = cache
            .get_or_fetch::<Vec<u32>, _, _>(QueryKey::topic(Topic::STOCK), STALE, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(NormalizedError::from_response(404, "Not Found", b"").into()) }
            })
            .await;
        let _ = cache
            .get_or_fetch::<Vec<u32>, _, _>(QueryKey::topic(Topic::STOCK), STALE, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AuthError::from(RefreshError::MissingRefreshToken).into()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_retry_delay_capped() {
        assert_eq!(retry_delay(0), Duration::from_secs(1));
        assert_eq!(retry_delay(2), Duration::from_secs(4));
        assert_eq!(retry_delay(10), RETRY_DELAY_MAX);
    }
}
