//! In-memory TTL cache for realtime lookups.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cached value paired with its own expiry instant.
///
/// The expiry lives inside the entry rather than in a side table so a key
/// and its deadline can never drift apart.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    touched: u64,
}

#[derive(Debug)]
struct CacheInner<V> {
    map: HashMap<String, CacheEntry<V>>,
    capacity: usize,
    clock: u64,
}

impl<V: Clone> CacheInner<V> {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    fn get(&mut self, key: &str) -> Option<V> {
        let now = Instant::now();
        match self.map.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                self.clock += 1;
                entry.touched = self.clock;
                Some(entry.value.clone())
            }
            Some(_) => {
                // Expired entries are treated as absent and dropped on read.
                self.map.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&mut self, key: String, value: V, ttl: Duration) {
        if self.map.len() >= self.capacity && !self.map.contains_key(&key) {
            self.evict_least_recently_used();
        }

        self.clock += 1;
        self.map.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
                touched: self.clock,
            },
        );
    }

    fn evict_least_recently_used(&mut self) {
        let oldest = self
            .map
            .iter()
            .min_by_key(|(_, entry)| entry.touched)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.map.remove(&key);
        }
    }

    fn invalidate(&mut self, pattern: Option<&str>) -> usize {
        match pattern {
            None => {
                let removed = self.map.len();
                self.map.clear();
                removed
            }
            Some(pattern) => {
                let before = self.map.len();
                self.map.retain(|key, _| !glob_match(pattern, key));
                before - self.map.len()
            }
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Thread-safe bounded cache with a per-entry time-to-live.
///
/// Capacity overflow evicts the least-recently-used entry (reads count as
/// use). `invalidate` accepts a `*`/`?` glob or `None` to clear everything.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    inner: Arc<tokio::sync::RwLock<CacheInner<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new(capacity))),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.write().await;
        inner.get(key)
    }

    pub async fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let mut inner = self.inner.write().await;
        inner.put(key.into(), value, ttl);
    }

    /// Remove entries matching the glob, or everything when `None`.
    /// Returns the number of removed entries.
    pub async fn invalidate(&self, pattern: Option<&str>) -> usize {
        let mut inner = self.inner.write().await;
        inner.invalidate(pattern)
    }

    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Glob matcher supporting `*` (any run) and `?` (any single character).
fn glob_match(pattern: &str, input: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let input: Vec<char> = input.chars().collect();

    let (mut p, mut i) = (0_usize, 0_usize);
    let mut star: Option<(usize, usize)> = None;

    while i < input.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == input[i]) {
            p += 1;
            i += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, i));
            p += 1;
        } else if let Some((star_p, star_i)) = star {
            p = star_p + 1;
            i = star_i + 1;
            star = Some((star_p, star_i + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|ch| *ch == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_and_overwrite() {
        let cache = TtlCache::new(16);

        assert!(cache.get("quote:600519").await.is_none());

        cache
            .put("quote:600519", 1700.0_f64, Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("quote:600519").await, Some(1700.0));

        cache
            .put("quote:600519", 1701.5_f64, Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("quote:600519").await, Some(1701.5));
    }

    #[tokio::test]
    async fn entries_expire_independently() {
        let cache = TtlCache::new(16);

        cache
            .put("quote:600519", 1_u32, Duration::from_millis(20))
            .await;
        cache.put("name:600519", 2_u32, Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(cache.get("quote:600519").await.is_none());
        assert_eq!(cache.get("name:600519").await, Some(2));
        // The expired entry was evicted by the read.
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn capacity_overflow_evicts_least_recently_used() {
        let cache = TtlCache::new(2);

        cache.put("a", 1_u32, Duration::from_secs(60)).await;
        cache.put("b", 2_u32, Duration::from_secs(60)).await;

        // Touch "a" so "b" becomes the eviction candidate.
        assert_eq!(cache.get("a").await, Some(1));
        cache.put("c", 3_u32, Duration::from_secs(60)).await;

        assert_eq!(cache.get("a").await, Some(1));
        assert!(cache.get("b").await.is_none());
        assert_eq!(cache.get("c").await, Some(3));
    }

    #[tokio::test]
    async fn wildcard_invalidation_removes_matching_namespace() {
        let cache = TtlCache::new(16);

        cache.put("quote:600519", 1_u32, Duration::from_secs(60)).await;
        cache.put("quote:000001", 2_u32, Duration::from_secs(60)).await;
        cache.put("name:600519", 3_u32, Duration::from_secs(60)).await;

        let removed = cache.invalidate(Some("quote:*")).await;
        assert_eq!(removed, 2);
        assert!(cache.get("quote:600519").await.is_none());
        assert_eq!(cache.get("name:600519").await, Some(3));

        let removed = cache.invalidate(None).await;
        assert_eq!(removed, 1);
        assert!(cache.is_empty().await);
    }

    #[test]
    fn glob_matcher_covers_star_and_question_mark() {
        assert!(glob_match("quote:*", "quote:600519"));
        assert!(glob_match("*:600519", "name:600519"));
        assert!(glob_match("quote:60051?", "quote:600519"));
        assert!(!glob_match("quote:*", "name:600519"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("quote:?", "quote:"));
    }
}
