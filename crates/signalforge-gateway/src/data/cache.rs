//! Tiny TTL cache with a hard entry cap.
//!
//! Expired entries are dropped on read. When the cache is full the oldest
//! insertion is evicted.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Slot<V> {
    inserted: Instant,
    expires: Instant,
    value: V,
}

pub struct TtlCache<K, V> {
    map: DashMap<K, Slot<V>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            map: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub(crate) fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        if !self.is_enabled() {
            return None;
        }
        match self.map.get(key) {
            Some(slot) if now <= slot.expires => return Some(slot.value.clone()),
            Some(_) => {}
            None => return None,
        };
        // read guard is released above; removing while holding it would deadlock
        self.map.remove(key);
        None
    }

    pub(crate) fn insert_at(&self, key: K, value: V, now: Instant) {
        if !self.is_enabled() {
            return;
        }
        if !self.map.contains_key(&key) && self.map.len() >= self.max_entries {
            self.evict_oldest();
        }
        self.map.insert(
            key,
            Slot {
                inserted: now,
                expires: now + self.ttl,
                value,
            },
        );
    }

    fn evict_oldest(&self) {
        let oldest = self
            .map
            .iter()
            .min_by_key(|e| e.value().inserted)
            .map(|e| e.key().clone());
        if let Some(k) = oldest {
            self.map.remove(&k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire_on_read() {
        let c = TtlCache::new(Duration::from_secs(15), 4);
        let t0 = Instant::now();
        c.insert_at("a", 1, t0);
        assert_eq!(c.get_at(&"a", t0 + Duration::from_secs(10)), Some(1));
        assert_eq!(c.get_at(&"a", t0 + Duration::from_secs(16)), None);
        assert!(c.is_empty());
    }

    #[test]
    fn full_cache_evicts_oldest_insertion() {
        let c = TtlCache::new(Duration::from_secs(60), 2);
        let t0 = Instant::now();
        c.insert_at("a", 1, t0);
        c.insert_at("b", 2, t0 + Duration::from_millis(1));
        c.insert_at("c", 3, t0 + Duration::from_millis(2));
        assert_eq!(c.len(), 2);
        assert_eq!(c.get_at(&"a", t0), None);
        assert_eq!(c.get_at(&"b", t0), Some(2));
        assert_eq!(c.get_at(&"c", t0), Some(3));
    }

    #[test]
    fn zero_ttl_disables_cache() {
        let c = TtlCache::new(Duration::ZERO, 2);
        c.insert("a", 1);
        assert_eq!(c.get(&"a"), None);
    }
}
