use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Keyed in-memory cache with a single time-to-live. Entries are process-local
/// and non-durable; a stale entry is simply ignored until the next `put`
/// overwrites it. Key sets here are small and fixed (one price key, one
/// metadata key per token id), so stale entries are not actively evicted.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, (Instant, V)>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a clone of the cached value if it is younger than the TTL.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).and_then(|(stored_at, value)| {
            if stored_at.elapsed() < self.ttl {
                Some(value.clone())
            } else {
                None
            }
        })
    }

    pub fn put(&self, key: K, value: V) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, (Instant::now(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_entry_is_returned() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(300));
        cache.put("nsi-price".to_string(), 42);

        assert_eq!(cache.get(&"nsi-price".to_string()), Some(42));
    }

    #[test]
    fn test_missing_key_is_none() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(300));

        assert_eq!(cache.get(&"nsi-price".to_string()), None);
    }

    #[test]
    fn test_expired_entry_is_ignored() {
        // Zero TTL: every entry is expired the moment it is stored.
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::ZERO);
        cache.put("nsi-price".to_string(), 42);

        assert_eq!(cache.get(&"nsi-price".to_string()), None);
    }

    #[test]
    fn test_put_overwrites_existing_entry() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(300));
        cache.put("book-1".to_string(), 1);
        cache.put("book-1".to_string(), 2);

        assert_eq!(cache.get(&"book-1".to_string()), Some(2));
    }
}
