//! In-memory result cache with TTL support.
//!
//! The cache is an owned object: the service holds one, tests build their
//! own with a [`ManualClock`]. Nothing here is process-global.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::CacheConfig;

/// Source of "now" for expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<StdMutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(StdMutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Cache categories with different TTLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    PlayerLog,    // 5 minutes
    TeamLogs,     // 10 minutes
    TeamResults,  // 10 minutes
    HeadToHead,   // 10 minutes
}

/// TTL per category
#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub player_log: Duration,
    pub team_logs: Duration,
    pub team_results: Duration,
}

impl CacheTtls {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            player_log: Duration::seconds(config.player_ttl_secs),
            team_logs: Duration::seconds(config.team_ttl_secs),
            team_results: Duration::seconds(config.results_ttl_secs),
        }
    }

    /// Get TTL duration
    pub fn ttl(&self, category: CacheCategory) -> Duration {
        match category {
            CacheCategory::PlayerLog => self.player_log,
            CacheCategory::TeamLogs => self.team_logs,
            CacheCategory::TeamResults | CacheCategory::HeadToHead => self.team_results,
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

/// Cache entry with timestamp
struct CacheEntry<V> {
    data: V,
    cached_at: DateTime<Utc>,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.cached_at <= ttl
    }
}

/// Memoizes successful fetches per key.
///
/// Entries are only ever replaced whole. A failed refetch leaves the
/// previous (expired) entry in place and stores nothing.
pub struct ResultCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
    serve_stale: bool,
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            serve_stale: false,
        }
    }

    /// Return the expired entry when a refetch fails
    pub fn serve_stale_on_failure(mut self, enabled: bool) -> Self {
        self.serve_stale = enabled;
        self
    }

    /// Get cached data if still within `ttl`
    pub async fn get(&self, key: &K, ttl: Duration) -> Option<V> {
        let now = self.clock.now();
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, ttl))
            .map(|entry| entry.data.clone())
    }

    /// Store data, replacing any previous entry for the key
    pub async fn insert(&self, key: K, data: V, ttl: Duration) {
        let entry = CacheEntry {
            data,
            cached_at: self.clock.now(),
            ttl,
        };
        self.entries.lock().await.insert(key, entry);
    }

    /// Return the cached value or run `fetch` and cache its success.
    ///
    /// The lock is not held while `fetch` runs.
    pub async fn get_or_fetch<E, F, Fut>(&self, key: K, ttl: Duration, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(data) = self.get(&key, ttl).await {
            debug!("Cache hit for {:?}", key);
            return Ok(data);
        }

        debug!("Cache miss for {:?}", key);
        match fetch().await {
            Ok(data) => {
                self.insert(key, data.clone(), ttl).await;
                Ok(data)
            }
            Err(e) => {
                if self.serve_stale {
                    if let Some(stale) = self.peek(&key).await {
                        warn!("Refetch failed for {:?}, serving stale entry", key);
                        return Ok(stale);
                    }
                }
                Err(e)
            }
        }
    }

    /// Cached data regardless of age
    pub async fn peek(&self, key: &K) -> Option<V> {
        self.entries
            .lock()
            .await
            .get(key)
            .map(|entry| entry.data.clone())
    }

    /// Drop every entry older than the TTL it was stored with.
    ///
    /// With serve-stale enabled expired entries are the failure fallback,
    /// so nothing is dropped.
    pub async fn purge_expired(&self) -> usize {
        if self.serve_stale {
            return 0;
        }
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now, entry.ttl));
        before - entries.len()
    }

    /// Clear all cache
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
