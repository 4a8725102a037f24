//! Short-lived cache in front of the upstream pipeline.
//!
//! Expiry is checked lazily on read against an injected [`Clock`]. Concurrent misses for the
//! same key share a single pipeline run.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};

use super::normalize::NormalizedWeather;
use crate::error::WeatherError;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub data: Arc<NormalizedWeather>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<CacheEntry>;
    async fn set(&self, key: String, entry: CacheEntry);
    async fn remove(&self, key: &str);
}

/// In-process store. Capacity-bounded; expiry is left to the gate.
pub struct MokaStore {
    cache: Cache<String, CacheEntry>,
}

impl MokaStore {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }
}

#[async_trait]
impl CacheStore for MokaStore {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.cache.get(key).await
    }

    async fn set(&self, key: String, entry: CacheEntry) {
        self.cache.insert(key, entry).await;
    }

    async fn remove(&self, key: &str) {
        self.cache.invalidate(key).await;
    }
}

type Flight = Arc<OnceCell<Result<Arc<NormalizedWeather>, WeatherError>>>;

pub struct WeatherCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    in_flight: Mutex<HashMap<String, Flight>>,
}

impl WeatherCache {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Moka-backed cache on the system clock.
    pub fn in_memory(max_capacity: u64, ttl: Duration) -> Self {
        Self::new(
            Arc::new(MokaStore::new(max_capacity)),
            Arc::new(SystemClock),
            ttl,
        )
    }

    /// Returns a live entry; a stale one is evicted and reported as a miss.
    pub async fn lookup(&self, key: &str) -> Option<Arc<NormalizedWeather>> {
        let entry = self.store.get(key).await?;
        if entry.has_expired(self.clock.now()) {
            tracing::debug!(key, "Cache entry expired");
            self.store.remove(key).await;
            return None;
        }
        Some(entry.data)
    }

    pub async fn insert(&self, key: String, data: Arc<NormalizedWeather>) {
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.store.set(key, CacheEntry { data, expires_at }).await;
    }

    /// Serves `key` from the cache, or runs `fetch` once for all concurrent callers and
    /// caches its result. Failures are handed to every waiter but never cached.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        fetch: F,
    ) -> Result<Arc<NormalizedWeather>, WeatherError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<NormalizedWeather, WeatherError>>,
    {
        if let Some(hit) = self.lookup(key).await {
            tracing::debug!(key, "Cache hit");
            return Ok(hit);
        }

        let flight = self.join_flight(key).await;
        let result = flight
            .get_or_init(|| async move {
                // A flight that just landed may have filled the cache.
                if let Some(hit) = self.lookup(key).await {
                    return Ok(hit);
                }
                tracing::debug!(key, "Cache miss, fetching upstream");
                let data = Arc::new(fetch().await?);
                self.insert(key.to_string(), Arc::clone(&data)).await;
                Ok::<_, WeatherError>(data)
            })
            .await
            .clone();

        self.land_flight(key, &flight).await;
        result
    }

    async fn join_flight(&self, key: &str) -> Flight {
        let mut in_flight = self.in_flight.lock().await;
        match in_flight.get(key) {
            // An initialized cell left behind by a cancelled caller is stale.
            Some(flight) if !flight.initialized() => Arc::clone(flight),
            _ => {
                let flight: Flight = Arc::new(OnceCell::new());
                in_flight.insert(key.to_string(), Arc::clone(&flight));
                flight
            }
        }
    }

    async fn land_flight(&self, key: &str, flight: &Flight) {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, flight))
        {
            in_flight.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::fixtures::{fixed_now, sample_weather};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct ManualClock(StdMutex<DateTime<Utc>>);

    impl ManualClock {
        fn at(now: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self(StdMutex::new(now)))
        }

        fn advance(&self, by: chrono::Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    const TTL: Duration = Duration::from_secs(120);

    fn cache_with(clock: Arc<ManualClock>) -> WeatherCache {
        WeatherCache::new(Arc::new(MokaStore::new(100)), clock, TTL)
    }

    #[tokio::test]
    async fn test_entry_lives_until_ttl() {
        let clock = ManualClock::at(fixed_now());
        let cache = cache_with(Arc::clone(&clock));

        cache.insert("k".to_string(), Arc::new(sample_weather())).await;
        assert!(cache.lookup("k").await.is_some());

        clock.advance(chrono::Duration::seconds(119));
        assert!(cache.lookup("k").await.is_some());

        clock.advance(chrono::Duration::seconds(1));
        assert!(cache.lookup("k").await.is_none());

        // Evicted, not just hidden.
        assert!(cache.store.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_hit_skips_fetch() {
        let clock = ManualClock::at(fixed_now());
        let cache = cache_with(clock);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let weather = cache
                .get_or_fetch("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sample_weather())
                })
                .await
                .unwrap();
            assert_eq!(weather.location.name, "Los Angeles");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let clock = ManualClock::at(fixed_now());
        let cache = cache_with(Arc::clone(&clock));
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_weather())
        };

        cache.get_or_fetch("k", fetch).await.unwrap();
        clock.advance(chrono::Duration::seconds(120));
        cache.get_or_fetch("k", fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let clock = ManualClock::at(fixed_now());
        let cache = cache_with(clock);
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(sample_weather())
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch("k", fetch),
            cache.get_or_fetch("k", fetch),
            cache.get_or_fetch("k", fetch),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert!(c.is_ok());
        assert!(cache.in_flight.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_shared_but_not_cached() {
        let clock = ManualClock::at(fixed_now());
        let cache = cache_with(clock);
        let calls = AtomicUsize::new(0);
        let failing = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(WeatherError::upstream(Some(503), "Forecast failed: 503"))
        };

        let (a, b) = tokio::join!(
            cache.get_or_fetch("k", failing),
            cache.get_or_fetch("k", failing),
        );
        assert_eq!(a.unwrap_err(), WeatherError::upstream(Some(503), "Forecast failed: 503"));
        assert!(b.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let recovered = cache
            .get_or_fetch("k", || async { Ok(sample_weather()) })
            .await;
        assert!(recovered.is_ok());
        assert!(cache.lookup("k").await.is_some());
    }

    #[tokio::test]
    async fn test_distinct_keys_fetch_independently() {
        let clock = ManualClock::at(fixed_now());
        let cache = cache_with(clock);
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(sample_weather())
        };

        cache.get_or_fetch("a", fetch).await.unwrap();
        cache.get_or_fetch("b", fetch).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
