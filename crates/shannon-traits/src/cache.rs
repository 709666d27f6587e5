//! Generic in-memory LRU cache with an eviction counter, per spec.md §4.11's
//! "Local LRU cache invariants: max N sessions (default 10k), LRU eviction
//! by last-access time, cache size + eviction counter exported."

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

struct Entry<V> {
    value: V,
    last_access: u64,
}

/// A simple LRU cache. `touch()` is monotonic-clock-free: callers supply a
/// logical clock (an incrementing counter), keeping the cache itself free of
/// wall-clock reads so it can be driven deterministically in tests and from
/// workflow-adjacent code per spec.md §9's "no wall-clock reads" rule.
pub struct LruCache<K, V> {
    capacity: usize,
    clock: AtomicU64,
    inner: Mutex<HashMap<K, Entry<V>>>,
    evictions: AtomicU64,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            clock: AtomicU64::new(0),
            inner: Mutex::new(HashMap::new()),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.get_mut(key) {
            entry.last_access = tick;
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: K, value: V) {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.lock();
        if inner.len() >= self.capacity && !inner.contains_key(&key) {
            if let Some(evict_key) = inner
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone())
            {
                inner.remove(&evict_key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        inner.insert(key, Entry { value, last_access: tick });
    }

    pub fn remove(&self, key: &K) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn eviction_count(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}
