//! In-memory response cache with TTL-only eviction.
//!
//! There is no capacity bound: entries live at most `ttl` and the volume is
//! bounded by a single interactive session, so expiry alone keeps memory in
//! check. Expired entries read as absent and are removed on every `put` and
//! by the optional background sweeper.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::response::Response;

/// Default entry lifetime (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// `tokio::time::interval` rejects a zero period
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub response: Response,
    pub stored_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > ttl
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub size: usize,
}

#[derive(Debug)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    stats: Mutex<CacheStats>,
    ttl: Duration,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            stats: Mutex::new(CacheStats::default()),
            ttl,
        }
    }

    /// Fresh response for `key`, or `None` if missing or older than the TTL.
    pub fn get(&self, key: &str) -> Option<Response> {
        let now = Instant::now();
        let found = {
            let entries = self.entries();
            entries
                .get(key)
                .filter(|entry| !entry.is_expired(self.ttl, now))
                .map(|entry| entry.response.clone())
        };

        let mut stats = self.stats_mut();
        if found.is_some() {
            stats.hits += 1;
            debug!(key = %key, "Response cache hit");
        } else {
            stats.misses += 1;
            debug!(key = %key, "Response cache miss");
        }
        found
    }

    /// Store `response` under `key`, overwriting any previous entry.
    pub fn put(&self, key: impl Into<String>, response: Response) {
        let now = Instant::now();
        let mut entries = self.entries();
        let expired = Self::sweep(&mut entries, self.ttl, now);
        entries.insert(
            key.into(),
            CacheEntry {
                response,
                stored_at: now,
            },
        );
        let size = entries.len();
        drop(entries);

        let mut stats = self.stats_mut();
        stats.expirations += expired as u64;
        stats.size = size;
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries();
        let expired = Self::sweep(&mut entries, self.ttl, Instant::now());
        let size = entries.len();
        drop(entries);

        if expired > 0 {
            debug!(expired, remaining = size, "Purged expired cache entries");
        }
        let mut stats = self.stats_mut();
        stats.expirations += expired as u64;
        stats.size = size;
        expired
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats_mut()
    }

    /// Run `purge_expired` every `interval` until the handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(cache) => {
                        cache.purge_expired();
                    }
                    None => break,
                }
            }
        })
    }

    fn sweep(entries: &mut HashMap<String, CacheEntry>, ttl: Duration, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(ttl, now));
        before - entries.len()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats_mut(&self) -> MutexGuard<'_, CacheStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(text: &str) -> Response {
        Response::processed(text, format!("processed {text}"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_trip_then_expiry() {
        let cache = ResponseCache::default();
        cache.put("k", sample("a"));
        assert_eq!(cache.get("k"), Some(sample("a")));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("k"), Some(sample("a")));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_key_overwrites_and_refreshes() {
        let cache = ResponseCache::new(Duration::from_secs(10));
        cache.put("k", sample("first"));
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put("k", sample("second"));
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(cache.get("k"), Some(sample("second")));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_sweeps_expired_entries() {
        let cache = ResponseCache::new(Duration::from_secs(10));
        cache.put("old-1", sample("1"));
        cache.put("old-2", sample("2"));
        tokio::time::advance(Duration::from_secs(11)).await;

        cache.put("new", sample("3"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().expirations, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_in_background() {
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(5)));
        cache.put("k", sample("a"));
        let handle = cache.spawn_sweeper(Duration::from_secs(1));

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(cache.is_empty());
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_sweep_interval_still_runs() {
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(1)));
        cache.put("k", sample("a"));
        let handle = cache.spawn_sweeper(Duration::ZERO);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!handle.is_finished());
        assert!(cache.is_empty());

        handle.abort();
        let err = handle.await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let cache = ResponseCache::default();
        assert!(cache.get("missing").is_none());
        cache.put("k", sample("a"));
        cache.get("k");
        cache.get("k");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
    }
}
