//! Capacity-bounded object caches with pluggable eviction
//!
//! Both policies map a key to `(bytes, size)` under a byte budget and behave
//! identically at the [`ObjectCache`] boundary:
//!
//! - [`LruCache`]: exact recency order, a list splice on every hit
//! - [`ClockCache`]: second-chance sweep, only a bit flip on a hit
//!
//! Every entry that leaves the cache (capacity pressure or [`ObjectCache::flush`])
//! is reported exactly once to the [`EvictionListener`] given at construction.
//! The listener runs while the cache's internal lock is held and must not call
//! back into the same cache.

mod clock;
mod lru;

pub use clock::ClockCache;
pub use lru::LruCache;

use bytes::Bytes;
use rangecache_common::{EvictionPolicy, Result};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bound for keys stored in an object cache
pub trait ObjectKey: Eq + Hash + Clone + Send + Sync + fmt::Debug {}

impl<K: Eq + Hash + Clone + Send + Sync + fmt::Debug> ObjectKey for K {}

/// Receives every entry removed from an object cache
pub trait EvictionListener<K>: Send + Sync {
    fn on_evict(&self, key: &K, value: &Bytes, size: u64);
}

impl<K, F> EvictionListener<K> for F
where
    F: Fn(&K, &Bytes, u64) + Send + Sync,
{
    fn on_evict(&self, key: &K, value: &Bytes, size: u64) {
        self(key, value, size);
    }
}

/// Listener that ignores evictions
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl<K> EvictionListener<K> for NoopListener {
    fn on_evict(&self, _key: &K, _value: &Bytes, _size: u64) {}
}

/// Object cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: AtomicU64,
    /// Number of cache misses
    pub misses: AtomicU64,
    /// Number of entries evicted (including flushes)
    pub evictions: AtomicU64,
    /// Number of sets rejected because the entry exceeds the capacity
    pub rejected: AtomicU64,
}

impl CacheStats {
    /// Calculate hit ratio (0.0 to 1.0)
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64
    }

    /// Reset all statistics
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
    }

    fn record_get(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Capacity-bounded key to bytes store
pub trait ObjectCache<K>: Send + Sync + fmt::Debug {
    /// Look up `key`, promoting it on a demand (non-preload) hit
    fn get(&self, key: &K, preloading: bool) -> Option<(Bytes, u64)>;

    /// Insert or overwrite `key`
    ///
    /// Returns `true` only when the key was not present before and the entry
    /// was stored. Overwrites return `false`; entries of size zero or larger
    /// than the capacity are rejected and also return `false`.
    fn set(&self, key: K, value: Bytes, size: u64, preloading: bool) -> bool;

    /// Evict every entry, reporting each one to the listener
    fn flush(&self);

    /// Configured capacity in bytes
    fn capacity(&self) -> u64;

    /// Bytes currently held
    fn used(&self) -> u64;

    /// Bytes still free
    fn available(&self) -> u64 {
        self.capacity().saturating_sub(self.used())
    }

    /// Number of entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> &CacheStats;
}

/// Build the object cache selected by `policy`
pub fn new_object_cache<K: ObjectKey + 'static>(
    policy: EvictionPolicy,
    capacity: u64,
    listener: Arc<dyn EvictionListener<K>>,
) -> Result<Box<dyn ObjectCache<K>>> {
    Ok(match policy {
        EvictionPolicy::Lru => Box::new(LruCache::new(capacity, listener)?),
        EvictionPolicy::Clock => Box::new(ClockCache::new(capacity, listener)?),
    })
}
