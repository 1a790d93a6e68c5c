//! Bounded least-recently-used cache
//!
//! One instance is shared (by reference) across every local item store a
//! record store table creates, so capacity is a single knob for the whole
//! process. Capacity 0 disables eviction; changing capacity takes effect on
//! the next eviction-triggering put.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::trace;

use vitalsync_core::Cache;

struct Inner<K, V> {
    map: HashMap<K, V>,
    // Recency order: front = least recently used, back = most recent.
    order: VecDeque<K>,
    max_count: usize,
}

impl<K: Eq + Hash + Clone, V> Inner<K, V> {
    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(key) = self.order.remove(pos) {
                self.order.push_back(key);
            }
        }
    }

    fn evict_over_capacity(&mut self) {
        if self.max_count == 0 {
            return;
        }
        while self.map.len() > self.max_count {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.map.remove(&oldest);
        }
    }
}

/// Fixed-capacity LRU cache, safe for concurrent use
pub struct LruCache<K, V> {
    inner: Mutex<Inner<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    /// Create a cache with the given capacity; 0 means unbounded
    pub fn new(max_count: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                order: VecDeque::new(),
                max_count,
            }),
        }
    }

    /// Number of entries currently cached
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// True if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone + Send, V: Clone + Send> Cache<K, V> for LruCache<K, V> {
    fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let value = inner.map.get(key).cloned()?;
        inner.touch(key);
        Some(value)
    }

    fn put(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        if inner.map.insert(key.clone(), value).is_some() {
            inner.touch(&key);
        } else {
            inner.order.push_back(key);
        }
        inner.evict_over_capacity();
    }

    fn remove(&self, key: &K) {
        let mut inner = self.inner.lock();
        if inner.map.remove(key).is_some() {
            if let Some(pos) = inner.order.iter().position(|k| k == key) {
                inner.order.remove(pos);
            }
        }
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        let dropped = inner.map.len();
        inner.map.clear();
        inner.order.clear();
        trace!(dropped, "item cache cleared");
    }

    fn keys(&self) -> Vec<K> {
        self.inner.lock().order.iter().cloned().collect()
    }

    fn max_count(&self) -> usize {
        self.inner.lock().max_count
    }

    fn set_max_count(&self, max_count: usize) {
        self.inner.lock().max_count = max_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(max: usize) -> LruCache<String, u32> {
        LruCache::new(max)
    }

    fn put(c: &LruCache<String, u32>, key: &str, value: u32) {
        Cache::put(c, key.to_string(), value);
    }

    fn get(c: &LruCache<String, u32>, key: &str) -> Option<u32> {
        Cache::get(c, &key.to_string())
    }

    // === Basic operations ===

    #[test]
    fn test_put_then_get_returns_value() {
        let c = cache(4);
        put(&c, "a", 1);
        assert_eq!(get(&c, "a"), Some(1));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let c = cache(4);
        assert_eq!(get(&c, "nope"), None);
    }

    #[test]
    fn test_put_existing_updates_value() {
        let c = cache(4);
        put(&c, "a", 1);
        put(&c, "a", 2);
        assert_eq!(get(&c, "a"), Some(2));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let c = cache(4);
        put(&c, "a", 1);
        put(&c, "b", 2);
        Cache::remove(&c, &"a".to_string());
        assert_eq!(get(&c, "a"), None);
        Cache::clear(&c);
        assert!(c.is_empty());
    }

    // === Eviction ===

    #[test]
    fn test_exceeding_capacity_evicts_oldest_insert() {
        let c = cache(3);
        put(&c, "a", 1);
        put(&c, "b", 2);
        put(&c, "c", 3);
        put(&c, "d", 4);
        assert_eq!(get(&c, "a"), None);
        assert_eq!(get(&c, "b"), Some(2));
        assert_eq!(get(&c, "d"), Some(4));
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn test_get_promotes_and_changes_eviction_order() {
        let c = cache(3);
        put(&c, "a", 1);
        put(&c, "b", 2);
        put(&c, "c", 3);
        // a becomes most-recent, so b is now oldest
        assert_eq!(get(&c, "a"), Some(1));
        put(&c, "d", 4);
        assert_eq!(get(&c, "b"), None);
        assert_eq!(get(&c, "a"), Some(1));
    }

    #[test]
    fn test_put_existing_promotes() {
        let c = cache(3);
        put(&c, "a", 1);
        put(&c, "b", 2);
        put(&c, "c", 3);
        put(&c, "a", 10);
        put(&c, "d", 4);
        assert_eq!(get(&c, "b"), None);
        assert_eq!(get(&c, "a"), Some(10));
    }

    #[test]
    fn test_zero_capacity_never_evicts() {
        let c = cache(0);
        for i in 0..100 {
            put(&c, &format!("k{i}"), i);
        }
        assert_eq!(c.len(), 100);
    }

    #[test]
    fn test_shrinking_capacity_applies_on_next_put() {
        let c = cache(0);
        for i in 0..10 {
            put(&c, &format!("k{i}"), i);
        }
        Cache::set_max_count(&c, 2);
        assert_eq!(c.len(), 10);
        put(&c, "fresh", 99);
        assert_eq!(c.len(), 2);
        assert_eq!(get(&c, "fresh"), Some(99));
    }

    #[test]
    fn test_keys_reports_recency_order() {
        let c = cache(4);
        put(&c, "a", 1);
        put(&c, "b", 2);
        get(&c, "a");
        assert_eq!(Cache::keys(&c), vec!["b".to_string(), "a".to_string()]);
    }

    // === Concurrency smoke ===

    #[test]
    fn test_concurrent_puts_and_gets() {
        use std::sync::Arc;
        let c = Arc::new(cache(32));
        let mut handles = Vec::new();
        for t in 0..4 {
            let c = Arc::clone(&c);
            handles.push(std::thread::spawn(move || {
                for i in 0..200 {
                    put(&c, &format!("k{}", (t * 7 + i) % 50), i);
                    get(&c, &format!("k{}", i % 50));
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(c.len() <= 32);
    }
}
