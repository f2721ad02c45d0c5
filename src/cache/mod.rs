//! Time-bounded memo caches
//!
//! Decisions repeat heavily (turret bursts, fire ticks), so small TTL
//! caches sit in front of group classification and the animal-targeting
//! sub-decision. Entries expire on read, on the periodic sweep, and by
//! explicit eviction when the host reports an entity destroyed.

use std::hash::Hash;
use std::time::{Duration, Instant};

use ahash::AHashMap;

/// TTL-bounded cache with a hard capacity limit.
///
/// At capacity the oldest entry is evicted. The cache never grows past
/// `max_capacity`, bounding memory regardless of sweep cadence.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    max_capacity: usize,
    entries: AHashMap<K, (V, Instant)>,
}

impl<K: Hash + Eq + Clone, V> TtlCache<K, V> {
    pub fn new(ttl: Duration, max_capacity: usize) -> Self {
        Self {
            ttl,
            max_capacity,
            entries: AHashMap::with_capacity(max_capacity.min(64)),
        }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&mut self, key: &K, now: Instant) -> Option<&V> {
        let expired = match self.entries.get(key) {
            Some((_, stamp)) => now.duration_since(*stamp) >= self.ttl,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|(value, _)| value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&mut self, key: K, value: V, now: Instant) {
        if self.entries.len() >= self.max_capacity && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        self.entries.insert(key, (value, now));
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every expired entry. Called from the host's periodic tick.
    pub fn sweep(&mut self) {
        self.sweep_at(Instant::now());
    }

    pub fn sweep_at(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, (_, stamp)| now.duration_since(*stamp) < ttl);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, (_, stamp))| *stamp)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> TtlCache<String, u32> {
        TtlCache::new(Duration::from_secs(60), 4)
    }

    #[test]
    fn test_hit_within_ttl() {
        let mut c = cache();
        let now = Instant::now();
        c.insert_at("a".to_string(), 1, now);
        assert_eq!(c.get_at(&"a".to_string(), now + Duration::from_secs(59)), Some(&1));
    }

    #[test]
    fn test_expiry_on_read() {
        let mut c = cache();
        let now = Instant::now();
        c.insert_at("a".to_string(), 1, now);
        assert_eq!(c.get_at(&"a".to_string(), now + Duration::from_secs(60)), None);
        assert!(c.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut c = cache();
        let now = Instant::now();
        for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
            c.insert_at(key.to_string(), i as u32, now + Duration::from_secs(i as u64));
        }
        c.insert_at("e".to_string(), 9, now + Duration::from_secs(10));
        assert_eq!(c.len(), 4);
        assert_eq!(c.get_at(&"a".to_string(), now + Duration::from_secs(11)), None);
        assert_eq!(c.get_at(&"e".to_string(), now + Duration::from_secs(11)), Some(&9));
    }

    #[test]
    fn test_reinsert_does_not_evict() {
        let mut c = cache();
        let now = Instant::now();
        for key in ["a", "b", "c", "d"] {
            c.insert_at(key.to_string(), 0, now);
        }
        c.insert_at("a".to_string(), 5, now + Duration::from_secs(1));
        assert_eq!(c.len(), 4);
        assert_eq!(c.get_at(&"a".to_string(), now + Duration::from_secs(2)), Some(&5));
    }

    #[test]
    fn test_sweep_drops_only_expired() {
        let mut c = cache();
        let now = Instant::now();
        c.insert_at("old".to_string(), 1, now);
        c.insert_at("new".to_string(), 2, now + Duration::from_secs(30));
        c.sweep_at(now + Duration::from_secs(61));
        assert_eq!(c.len(), 1);
        assert_eq!(c.get_at(&"new".to_string(), now + Duration::from_secs(61)), Some(&2));
    }

    #[test]
    fn test_explicit_removal() {
        let mut c = cache();
        c.insert("a".to_string(), 1);
        assert!(c.remove(&"a".to_string()));
        assert!(!c.remove(&"a".to_string()));
    }
}
