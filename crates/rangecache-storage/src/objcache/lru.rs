//! Exact LRU object cache
//!
//! Entries live in a slab-backed doubly linked list ordered from most to least
//! recently used, with a key index into the slab. Hits splice the node to the
//! front; evictions pop from the back.

use super::{CacheStats, EvictionListener, ObjectCache, ObjectKey};
use bytes::Bytes;
use parking_lot::Mutex;
use rangecache_common::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{trace, warn};

struct LruNode<K> {
    key: K,
    value: Bytes,
    size: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

/// LRU cache internal state
struct LruState<K> {
    nodes: Vec<Option<LruNode<K>>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    /// Most recently used
    head: Option<usize>,
    /// Least recently used
    tail: Option<usize>,
    used: u64,
    capacity: u64,
}

impl<K: ObjectKey> LruState<K> {
    fn new(capacity: u64) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            used: 0,
            capacity,
        }
    }

    fn node(&self, idx: usize) -> &LruNode<K> {
        self.nodes[idx].as_ref().expect("LRU index points at a live node")
    }

    fn node_mut(&mut self, idx: usize) -> &mut LruNode<K> {
        self.nodes[idx].as_mut().expect("LRU index points at a live node")
    }

    fn alloc(&mut self, node: LruNode<K>) -> usize {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head != Some(idx) {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    /// Remove the least recently used entry
    fn pop_back(&mut self) -> Option<LruNode<K>> {
        let idx = self.tail?;
        self.unlink(idx);
        let node = self.nodes[idx].take()?;
        self.free.push(idx);
        self.index.remove(&node.key);
        self.used = self.used.saturating_sub(node.size);
        Some(node)
    }
}

/// Least-recently-used object cache with a byte budget
pub struct LruCache<K> {
    state: Mutex<LruState<K>>,
    listener: Arc<dyn EvictionListener<K>>,
    stats: CacheStats,
}

impl<K: ObjectKey> LruCache<K> {
    /// Create a new LRU cache holding at most `capacity` bytes
    pub fn new(capacity: u64, listener: Arc<dyn EvictionListener<K>>) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::configuration("LRU cache capacity must be positive"));
        }
        Ok(Self {
            state: Mutex::new(LruState::new(capacity)),
            listener,
            stats: CacheStats::default(),
        })
    }

    fn evict(&self, node: &LruNode<K>) {
        trace!(key = ?node.key, size = node.size, "LRU evict");
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        self.listener.on_evict(&node.key, &node.value, node.size);
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> Vec<K> {
        let state = self.state.lock();
        let mut keys = Vec::with_capacity(state.index.len());
        let mut cursor = state.head;
        while let Some(idx) = cursor {
            let node = state.node(idx);
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }
}

impl<K: ObjectKey> ObjectCache<K> for LruCache<K> {
    fn get(&self, key: &K, preloading: bool) -> Option<(Bytes, u64)> {
        let mut state = self.state.lock();
        let found = state.index.get(key).copied().map(|idx| {
            // read-ahead does not count as use
            if !preloading {
                state.move_to_front(idx);
            }
            let node = state.node(idx);
            (node.value.clone(), node.size)
        });
        self.stats.record_get(found.is_some());
        found
    }

    fn set(&self, key: K, value: Bytes, size: u64, _preloading: bool) -> bool {
        let mut state = self.state.lock();
        // zero-sized entries would never make room for anything
        if size == 0 || size > state.capacity {
            warn!(key = ?key, size, capacity = state.capacity, "entry size outside LRU cache bounds");
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        if let Some(idx) = state.index.get(&key).copied() {
            let old_size = {
                let node = state.node_mut(idx);
                node.value = value;
                std::mem::replace(&mut node.size, size)
            };
            state.used = state.used.saturating_sub(old_size).saturating_add(size);
            state.move_to_front(idx);
            // the overwritten entry is at the front, so only others go
            while state.used > state.capacity && state.tail != Some(idx) {
                match state.pop_back() {
                    Some(evicted) => self.evict(&evicted),
                    None => break,
                }
            }
            return false;
        }

        while state.used.saturating_add(size) > state.capacity {
            match state.pop_back() {
                Some(evicted) => self.evict(&evicted),
                None => break,
            }
        }

        let idx = state.alloc(LruNode {
            key: key.clone(),
            value,
            size,
            prev: None,
            next: None,
        });
        state.push_front(idx);
        state.index.insert(key, idx);
        state.used = state.used.saturating_add(size).min(state.capacity);
        true
    }

    fn flush(&self) {
        let mut state = self.state.lock();
        while let Some(evicted) = state.pop_back() {
            self.evict(&evicted);
        }
        state.nodes.clear();
        state.free.clear();
        state.used = 0;
    }

    fn capacity(&self) -> u64 {
        self.state.lock().capacity
    }

    fn used(&self) -> u64 {
        self.state.lock().used
    }

    fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl<K> fmt::Debug for LruCache<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LruCache")
            .field("entries", &state.index.len())
            .field("used", &state.used)
            .field("capacity", &state.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objcache::NoopListener;

    fn cache(capacity: u64) -> LruCache<&'static str> {
        LruCache::new(capacity, Arc::new(NoopListener)).unwrap()
    }

    fn entry() -> Bytes {
        Bytes::from_static(&[0u8; 10])
    }

    #[test]
    fn test_lru_evicts_oldest() {
        let cache = cache(20);
        assert!(cache.set("a", entry(), 10, false));
        assert!(cache.set("b", entry(), 10, false));
        assert!(cache.set("c", entry(), 10, false));

        assert!(cache.get(&"a", false).is_none());
        assert!(cache.get(&"b", false).is_some());
        assert!(cache.get(&"c", false).is_some());
        assert_eq!(cache.used(), 20);
    }

    #[test]
    fn test_lru_hit_promotes() {
        let cache = cache(20);
        cache.set("a", entry(), 10, false);
        cache.set("b", entry(), 10, false);
        assert_eq!(cache.keys(), vec!["b", "a"]);

        cache.get(&"a", false);
        assert_eq!(cache.keys(), vec!["a", "b"]);

        cache.set("c", entry(), 10, false);
        assert_eq!(cache.keys(), vec!["c", "a"]);
    }

    #[test]
    fn test_lru_preload_get_does_not_promote() {
        let cache = cache(20);
        cache.set("a", entry(), 10, false);
        cache.set("b", entry(), 10, false);

        assert!(cache.get(&"a", true).is_some());
        assert_eq!(cache.keys(), vec!["b", "a"]);

        cache.set("c", entry(), 10, false);
        assert!(cache.get(&"a", false).is_none());
    }

    #[test]
    fn test_lru_overwrite_promotes() {
        let cache = cache(30);
        cache.set("a", entry(), 10, false);
        cache.set("b", entry(), 10, false);
        assert!(!cache.set("a", entry(), 5, false));
        assert_eq!(cache.keys(), vec!["a", "b"]);
        assert_eq!(cache.used(), 15);
        assert_eq!(cache.available(), 15);
    }

    #[test]
    fn test_lru_slots_reused_after_eviction() {
        let cache = cache(30);
        for i in 0..100u64 {
            let key: &'static str = Box::leak(i.to_string().into_boxed_str());
            cache.set(key, entry(), 10, false);
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.state.lock().nodes.len() <= 4);
        assert_eq!(cache.keys(), vec!["99", "98", "97"]);
    }
}
