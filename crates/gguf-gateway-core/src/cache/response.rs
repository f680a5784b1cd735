//! In-memory TTL cache for upstream responses.

use crate::config::CacheConfig;
use crate::error::Result;
use mini_moka::sync::Cache;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Request signature used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a GET: the URL alone.
    pub fn get(url: &str) -> Self {
        CacheKey(format!("GET:{}", url))
    }

    /// Key for a POST: the URL plus the body, so distinct bodies never collide.
    pub fn post(url: &str, body: &str) -> Self {
        CacheKey(format!("POST:{}:{}", url, body))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A cached response body with its absolute expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<str>,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Get-or-fetch cache shielding the upstream API from duplicate traffic.
///
/// Expired entries are refreshed lazily on the next access. Concurrent misses on
/// the same key share one fetch.
pub struct ResponseCache {
    entries: Cache<CacheKey, CacheEntry>,
    /// Per-key gates for fetches currently in progress.
    in_flight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    default_ttl: Duration,
}

impl ResponseCache {
    /// Create a cache with the default 15 minute TTL.
    pub fn new() -> Self {
        Self::with_ttl(CacheConfig::DEFAULT_TTL)
    }

    /// Create a cache whose entries live for `default_ttl` unless told otherwise.
    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(CacheConfig::MAX_CAPACITY)
                .time_to_live(CacheConfig::MAX_TTL)
                .build(),
            in_flight: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Return the fresh value for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<str>> {
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh() => Some(entry.value),
            Some(_) => {
                self.entries.invalidate(key);
                None
            }
            None => None,
        }
    }

    /// Store `value` under `key` for `ttl`.
    pub fn insert(&self, key: CacheKey, value: impl Into<Arc<str>>, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                value: value.into(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result.
    ///
    /// Failed fetches are not cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, ttl: Duration, fetch: F) -> Result<Arc<str>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        if let Some(value) = self.get(&key) {
            debug!("Cache hit: {}", key.as_str());
            return Ok(value);
        }

        let gate = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.entry(key.clone()).or_default().clone()
        };
        let _guard = gate.lock().await;

        // Another request may have filled the entry while we waited.
        if let Some(value) = self.get(&key) {
            debug!("Cache filled while waiting: {}", key.as_str());
            return Ok(value);
        }

        debug!("Cache miss: {}", key.as_str());
        let result = fetch().await;

        let outcome = result.map(|body| {
            let value: Arc<str> = body.into();
            self.insert(key.clone(), value.clone(), ttl);
            value
        });

        self.in_flight.lock().await.remove(&key);
        outcome
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
