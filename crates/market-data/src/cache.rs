use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// Passive time-to-live cache. Entries expire a fixed duration after they
/// were stored; reads never extend them and nothing invalidates on write.
pub struct TtlCache<T> {
    entries: DashMap<String, CacheEntry<T>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        if Utc::now() - entry.cached_at < self.ttl {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    /// Store `data`, dropping whatever has already expired.
    pub fn insert(&self, key: String, data: T) {
        self.purge_expired();
        self.entries.insert(
            key,
            CacheEntry {
                data,
                cached_at: Utc::now(),
            },
        );
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let now = Utc::now();
        self.entries.retain(|_, entry| now - entry.cached_at < self.ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[test]
    fn test_hit_within_ttl() {
        let cache = TtlCache::new(StdDuration::from_secs(60));
        cache.insert("2330:1d:TW".to_string(), vec![1, 2, 3]);
        assert_eq!(cache.get("2330:1d:TW"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get("2330:5d:TW"), None);
    }

    #[test]
    fn test_zero_ttl_always_misses() {
        let cache = TtlCache::new(StdDuration::ZERO);
        cache.insert("AAPL".to_string(), 1.0);
        assert_eq!(cache.get("AAPL"), None);
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_drops_expired_entries() {
        let cache = TtlCache::new(StdDuration::ZERO);
        cache.insert("2330:1d:TW".to_string(), 1);
        cache.insert("2330:5d:TW".to_string(), 2);
        // The first entry expired before the second was stored
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_insert_replaces_entry() {
        let cache = TtlCache::new(StdDuration::from_secs(60));
        cache.insert("AAPL".to_string(), "old");
        cache.insert("AAPL".to_string(), "new");
        assert_eq!(cache.get("AAPL"), Some("new"));
        assert_eq!(cache.len(), 1);
    }
}
