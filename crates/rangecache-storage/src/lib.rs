//! Rangecache storage - in-memory byte-range caching
//!
//! This crate implements the memory cache tier used by the file service:
//! - Augmented interval tree and per-file overlap checking
//! - Capacity-bounded object caches (LRU and Clock eviction)
//! - `MemCache`, the IO-vector facade with an asynchronous update queue

pub mod interval;
pub mod mem_cache;
pub mod objcache;

// Re-exports
pub use interval::{Interval, IntervalTree, OverlapChecker};
pub use mem_cache::{MemCache, MemCacheSnapshot};
pub use objcache::{
    CacheStats, ClockCache, EvictionListener, LruCache, NoopListener, ObjectCache, ObjectKey,
    new_object_cache,
};
