//! Ephemeral TTL-bounded session cache
//!
//! Holds quality-selection sessions and collection listings between the
//! moment metadata is fetched and the moment the user presses a quality
//! button. Entries are evicted by a periodic sweep task; there is no
//! capacity bound, so long-running deployments rely on TTL eviction alone.
//!
//! Sweep semantics are best-effort: a lookup never blocks on eviction
//! timing, and an entry logically past its TTL may still be returned until
//! the next sweep pass removes it.

use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Key-value store with per-entry TTL and periodic sweep eviction
pub struct SessionCache<V> {
    entries: Arc<Mutex<HashMap<String, CacheEntry<V>>>>,
    default_ttl: Duration,
}

impl<V> Clone for SessionCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            default_ttl: self.default_ttl,
        }
    }
}

impl<V: Clone + Send + 'static> SessionCache<V> {
    /// Create a cache whose entries default to `default_ttl`
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            default_ttl,
        }
    }

    /// Insert a value under `key` with the default TTL
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// Insert a value under `key` with an explicit TTL
    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.lock().insert(key.into(), entry);
    }

    /// Look up a value without consuming it
    pub fn get(&self, key: &str) -> Option<V> {
        self.lock().get(key).map(|e| e.value.clone())
    }

    /// Look up and consume a value in one step (one-shot session flows).
    ///
    /// A second call with the same key returns `None`, which callers treat
    /// as session expiry.
    pub fn take(&self, key: &str) -> Option<V> {
        self.lock().remove(key).map(|e| e.value)
    }

    /// Remove a value without returning it
    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Number of live (not yet swept) entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every entry whose TTL has elapsed, returning how many were evicted
    pub fn sweep_now(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    /// Spawn the background sweep task.
    ///
    /// The sweeper is what guarantees eviction for entries that are never
    /// looked up again; lazy checks alone would leak them.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately; skip it so the first real
            // sweep happens one interval from now
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = cache.sweep_now();
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = cache.len(), "Cache sweep");
                }
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // Lock poisoning only happens if a holder panicked mid-mutation;
        // the map operations here cannot panic, so recover the guard
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Generate a session token: millisecond timestamp plus a random suffix.
///
/// Uniqueness within the TTL window is the only hard requirement — two
/// sessions created in the same millisecond still get distinct keys, so a
/// collision cannot silently merge them.
pub fn session_token() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u16 = rand::thread_rng().r#gen();
    format!("{millis:x}{suffix:04x}")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let cache = SessionCache::new(Duration::from_secs(60));
        cache.insert("k", "v".to_string());
        assert_eq!(cache.get("k"), Some("v".to_string()));
        assert_eq!(cache.get("k"), Some("v".to_string()), "get does not consume");
    }

    #[test]
    fn take_consumes_exactly_once() {
        let cache = SessionCache::new(Duration::from_secs(60));
        cache.insert("k", 1u32);
        assert_eq!(cache.take("k"), Some(1));
        assert_eq!(cache.take("k"), None, "second take must miss");
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn sweep_removes_expired_entries() {
        let cache = SessionCache::new(Duration::from_secs(60));
        cache.insert_with_ttl("old", 1u32, Duration::from_millis(0));
        cache.insert_with_ttl("fresh", 2u32, Duration::from_secs(60));

        std::thread::sleep(Duration::from_millis(5));
        let evicted = cache.sweep_now();

        assert_eq!(evicted, 1);
        assert_eq!(cache.get("old"), None);
        assert_eq!(cache.get("fresh"), Some(2));
    }

    #[tokio::test]
    async fn background_sweeper_evicts_after_ttl_plus_granularity() {
        let cache = SessionCache::new(Duration::from_millis(20));
        cache.insert("k", 1u32);

        let handle = cache.spawn_sweeper(Duration::from_millis(30));

        // TTL (20ms) plus sweep granularity (30ms) plus scheduling slack
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get("k"), None, "entry should be gone after TTL + sweep");

        handle.abort();
    }

    #[test]
    fn stale_entry_may_still_hit_before_sweep() {
        let cache = SessionCache::new(Duration::from_millis(0));
        cache.insert("k", 1u32);
        std::thread::sleep(Duration::from_millis(5));
        // Best-effort contract: no purge on read
        assert_eq!(cache.get("k"), Some(1));
        cache.sweep_now();
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn tokens_are_distinct_within_a_burst() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            assert!(seen.insert(session_token()), "token collision in burst");
        }
    }
}
