//! In-memory byte-range cache used by the file service
//!
//! [`MemCache`] serves [`IoVector`] reads from an [`ObjectCache`] and
//! populates it after the caller has fetched missing ranges. Every cached
//! range is also registered with an [`OverlapChecker`]; the object cache's
//! eviction listener unregisters it, and one update lock serializes
//! `register + set` and `flush` so both structures always change together.
//! A range is registered before it is stored, so a range the checker rejects
//! is never served.
//!
//! An invariant violation panics in the thread that hit it and poisons the
//! cache: every later read, update and flush fails with [`Error::Poisoned`].
//!
//! Asynchronous updates are queued on a bounded channel drained in FIFO
//! order by a single background thread. A full queue blocks the caller.
//! Dropping the cache closes the queue, lets the worker finish everything
//! already queued and joins it.

use crate::interval::OverlapChecker;
use crate::objcache::{EvictionListener, ObjectCache, new_object_cache};
use bytes::Bytes;
use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::Mutex;
use rangecache_common::{
    CacheCounter, CacheKey, CounterSink, Error, FilePath, IoContext, IoVector, MemCacheConfig,
    Result,
};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Name of the background update thread
const WORKER_THREAD_NAME: &str = "rangecache-update";

/// How often a waiter re-checks that the worker is still alive
const WORKER_POLL_INTERVAL: Duration = Duration::from_millis(50);

type UpdateJob = Box<dyn FnOnce() + Send>;

/// Mark the cache unusable and abort the current thread
fn escalate(poisoned: &AtomicBool, err: &Error) -> ! {
    poisoned.store(true, Ordering::Release);
    error!("Memory cache invariant violated: {}", err);
    panic!("{err}");
}

/// Unregisters evicted ranges from the overlap checker
struct OverlapEvictionListener {
    checker: Arc<Mutex<OverlapChecker>>,
    poisoned: Arc<AtomicBool>,
}

impl EvictionListener<CacheKey> for OverlapEvictionListener {
    fn on_evict(&self, key: &CacheKey, _value: &Bytes, _size: u64) {
        let (low, high) = key.interval();
        let removed = self.checker.lock().remove(&key.path, low, high);
        if let Err(e) = removed {
            escalate(&self.poisoned, &e);
        }
    }
}

/// Object cache and overlap checker that change in lockstep
struct CacheCore {
    objects: Box<dyn ObjectCache<CacheKey>>,
    checker: Arc<Mutex<OverlapChecker>>,
    /// Serializes register + set, flush and checker reads
    update_lock: Mutex<()>,
    poisoned: Arc<AtomicBool>,
}

impl CacheCore {
    fn ensure_usable(&self) -> Result<()> {
        if self.poisoned.load(Ordering::Acquire) {
            return Err(Error::Poisoned);
        }
        Ok(())
    }

    fn set(&self, key: CacheKey, value: Bytes, size: u64, preloading: bool) -> Result<bool> {
        let _guard = self.update_lock.lock();
        self.ensure_usable()?;
        let (low, high) = key.interval();
        let path = key.path.clone();

        // a registered key is an overwrite and keeps its registration
        let registered = self.checker.lock().contains(&path, low, high);
        if !registered {
            let result = self.checker.lock().insert(&path, low, high);
            if let Err(e) = result {
                escalate(&self.poisoned, &e);
            }
        }

        let inserted = self.objects.set(key, value, size, preloading);
        if !registered && !inserted {
            // rejected by the object cache
            let result = self.checker.lock().remove(&path, low, high);
            if let Err(e) = result {
                escalate(&self.poisoned, &e);
            }
        }
        Ok(inserted)
    }

    fn flush(&self) -> Result<()> {
        let _guard = self.update_lock.lock();
        self.ensure_usable()?;
        self.objects.flush();
        Ok(())
    }
}

/// Point-in-time view of the cache taken under the update lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemCacheSnapshot {
    /// Entries held by the object cache
    pub entries: usize,
    /// Ranges registered with the overlap checker
    pub tracked_ranges: usize,
    /// Files with at least one registered range
    pub tracked_files: usize,
    pub used: u64,
    pub capacity: u64,
}

/// Byte-range memory cache in front of the remote file service
pub struct MemCache {
    core: Arc<CacheCore>,
    queue: Option<Sender<UpdateJob>>,
    worker: Option<JoinHandle<()>>,
    counter_sinks: Vec<Arc<dyn CounterSink>>,
    config: MemCacheConfig,
}

impl MemCache {
    /// Build a memory cache and start its update worker
    pub fn new(config: MemCacheConfig) -> Result<Self> {
        config.validate()?;

        let checker = Arc::new(Mutex::new(OverlapChecker::new(config.policy.checker_tag())));
        let poisoned = Arc::new(AtomicBool::new(false));
        let listener = Arc::new(OverlapEvictionListener {
            checker: Arc::clone(&checker),
            poisoned: Arc::clone(&poisoned),
        });
        let objects = new_object_cache(config.policy, config.capacity, listener)?;
        let core = Arc::new(CacheCore {
            objects,
            checker,
            update_lock: Mutex::new(()),
            poisoned,
        });

        let (queue, jobs) = crossbeam_channel::bounded::<UpdateJob>(config.queue_depth);
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("Cache update worker started");
                for job in jobs {
                    job();
                }
                debug!("Cache update worker stopped");
            })
            .map_err(|e| Error::internal(format!("failed to spawn cache update worker: {e}")))?;

        info!(
            "Memory cache initialized: policy={}, capacity={} bytes, queue depth={}",
            config.policy, config.capacity, config.queue_depth
        );

        Ok(Self {
            core,
            queue: Some(queue),
            worker: Some(worker),
            counter_sinks: Vec::new(),
            config,
        })
    }

    /// LRU cache with default queue depth
    pub fn lru(capacity: u64) -> Result<Self> {
        Self::new(MemCacheConfig::lru(capacity))
    }

    /// Clock cache with default queue depth
    pub fn clock(capacity: u64) -> Result<Self> {
        Self::new(MemCacheConfig::clock(capacity))
    }

    /// Counter sinks updated by every read, in addition to the call's own
    #[must_use]
    pub fn with_counter_sinks(
        mut self,
        sinks: impl IntoIterator<Item = Arc<dyn CounterSink>>,
    ) -> Self {
        self.counter_sinks.extend(sinks);
        self
    }

    pub fn config(&self) -> &MemCacheConfig {
        &self.config
    }

    /// Resolve cacheable, unresolved entries of `vector` from the cache
    ///
    /// Misses are left unresolved for the caller to fetch.
    pub fn read(&self, ctx: &IoContext, vector: &mut IoVector) -> Result<()> {
        if vector.no_cache {
            return Ok(());
        }
        self.core.ensure_usable()?;

        let mut num_read = 0;
        let mut num_hit = 0;
        let result = self.read_entries(vector, &mut num_read, &mut num_hit);
        self.report_read(ctx, num_read, num_hit);
        result
    }

    fn read_entries(&self, vector: &mut IoVector, num_read: &mut u64, num_hit: &mut u64) -> Result<()> {
        let path = FilePath::parse(&vector.file_path)?;
        let preloading = vector.preloading;

        for entry in &mut vector.entries {
            if entry.is_done() || !entry.cacheable {
                continue;
            }
            let key = CacheKey::new(path.file.as_str(), entry.offset, entry.size);
            *num_read += 1;
            if let Some((object, size)) = self.core.objects.get(&key, preloading) {
                trace!(key = %key, "memory cache hit");
                entry.resolve(object, size);
                *num_hit += 1;
            }
        }
        Ok(())
    }

    fn report_read(&self, ctx: &IoContext, num_read: u64, num_hit: u64) {
        let capacity = self.core.objects.capacity();
        let used = self.core.objects.used();
        let available = self.core.objects.available();

        for sink in ctx.sinks().iter().chain(&self.counter_sinks) {
            sink.add(CacheCounter::Read, num_read);
            sink.add(CacheCounter::Hit, num_hit);
            sink.add(CacheCounter::MemoryRead, num_read);
            sink.add(CacheCounter::MemoryHit, num_hit);
            sink.swap(CacheCounter::MemoryCapacity, capacity);
            sink.swap(CacheCounter::MemoryUsed, used);
            sink.swap(CacheCounter::MemoryAvailable, available);
        }
    }

    /// Store the fetched entries of `vector` in the cache
    ///
    /// With `async_update` the stores are queued for the background worker and
    /// become visible eventually; the call blocks only while the queue is full.
    pub fn update(&self, _ctx: &IoContext, vector: &IoVector, async_update: bool) -> Result<()> {
        if vector.no_cache {
            return Ok(());
        }
        self.core.ensure_usable()?;

        let path = FilePath::parse(&vector.file_path)?;
        let preloading = vector.preloading;

        for entry in &vector.entries {
            if !entry.cacheable {
                continue;
            }
            let Some(object) = &entry.object else {
                continue;
            };
            let key = CacheKey::new(path.file.as_str(), entry.offset, entry.size);

            if async_update {
                let core = Arc::clone(&self.core);
                let object = object.clone();
                let size = entry.object_size;
                self.enqueue(Box::new(move || {
                    if let Err(e) = core.set(key, object, size, preloading) {
                        warn!("Dropped queued cache update: {}", e);
                    }
                }))?;
            } else {
                self.core.set(key, object.clone(), entry.object_size, preloading)?;
            }
        }
        Ok(())
    }

    fn enqueue(&self, job: UpdateJob) -> Result<()> {
        let queue = self.queue.as_ref().ok_or(Error::UpdateWorkerStopped)?;
        queue.send(job).map_err(|_| Error::UpdateWorkerStopped)
    }

    fn worker_alive(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Block until every asynchronous update queued before this call has been applied
    pub fn wait_for_pending_updates(&self) -> Result<()> {
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
        self.enqueue(Box::new(move || {
            let _ = done_tx.send(());
        }))?;

        loop {
            match done_rx.recv_timeout(WORKER_POLL_INTERVAL) {
                Ok(()) => return Ok(()),
                Err(RecvTimeoutError::Timeout) if self.worker_alive() => {}
                Err(_) => return Err(Error::UpdateWorkerStopped),
            }
        }
    }

    /// Evict everything
    pub fn flush(&self) -> Result<()> {
        debug!("Flushing memory cache");
        self.core.flush()
    }

    /// True once an invariant violation has made the cache unusable
    pub fn is_poisoned(&self) -> bool {
        self.core.poisoned.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> u64 {
        self.core.objects.capacity()
    }

    pub fn used(&self) -> u64 {
        self.core.objects.used()
    }

    pub fn available(&self) -> u64 {
        self.core.objects.available()
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.core.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Object cache hit/miss/eviction statistics
    pub fn stats(&self) -> &crate::objcache::CacheStats {
        self.core.objects.stats()
    }

    /// Consistent view of cache and checker state
    pub fn snapshot(&self) -> MemCacheSnapshot {
        let _guard = self.core.update_lock.lock();
        let entries = self.core.objects.len();
        let used = self.core.objects.used();
        let checker = self.core.checker.lock();
        MemCacheSnapshot {
            entries,
            tracked_ranges: checker.range_count(),
            tracked_files: checker.namespace_count(),
            used,
            capacity: self.core.objects.capacity(),
        }
    }

    /// Number of byte ranges registered with the overlap checker
    pub fn tracked_ranges(&self) -> usize {
        let _guard = self.core.update_lock.lock();
        self.core.checker.lock().range_count()
    }

    /// Ranges currently registered for `file`, in ascending order
    pub fn ranges(&self, file: &str) -> Vec<(u64, u64)> {
        let _guard = self.core.update_lock.lock();
        self.core.checker.lock().ranges(file)
    }
}

impl Drop for MemCache {
    fn drop(&mut self) {
        // closing the queue lets the worker drain what is left and exit
        drop(self.queue.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Cache update worker panicked");
            }
        }
    }
}

impl fmt::Debug for MemCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemCache")
            .field("config", &self.config)
            .field("objects", &self.core.objects)
            .field("counter_sinks", &self.counter_sinks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rangecache_common::{CounterSet, EvictionPolicy, IoEntry};

    fn fetched(path: &str, offset: u64, data: &[u8]) -> IoVector {
        let mut entry = IoEntry::new(offset, data.len() as u64);
        entry.resolve(Bytes::copy_from_slice(data), data.len() as u64);
        IoVector::new(path, vec![entry])
    }

    fn request(path: &str, offset: u64, size: u64) -> IoVector {
        IoVector::new(path, vec![IoEntry::new(offset, size)])
    }

    #[test]
    fn test_read_update_round_trip() {
        for policy in [EvictionPolicy::Lru, EvictionPolicy::Clock] {
            let cache = MemCache::new(MemCacheConfig {
                policy,
                ..MemCacheConfig::default()
            })
            .unwrap();
            let ctx = IoContext::new();
            let data = vec![42u8; 100];

            cache.update(&ctx, &fetched("f", 0, &data), false).unwrap();

            let mut vector = request("f", 0, 100);
            cache.read(&ctx, &mut vector).unwrap();
            assert!(vector.entries[0].is_done());
            assert_eq!(vector.entries[0].object.as_deref(), Some(data.as_slice()));
            assert_eq!(vector.entries[0].object_size, 100);

            let mut partial = request("f", 50, 100);
            cache.read(&ctx, &mut partial).unwrap();
            assert!(!partial.entries[0].is_done());
            assert!(partial.entries[0].object.is_none());
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = MemCache::lru(0).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_no_cache_vector_is_noop() {
        let cache = MemCache::lru(1024).unwrap();
        let ctx = IoContext::new();
        cache
            .update(&ctx, &fetched("f", 0, b"abc").with_no_cache(), false)
            .unwrap();
        assert!(cache.is_empty());

        let mut vector = IoVector {
            file_path: String::new(),
            ..request("f", 0, 3).with_no_cache()
        };
        // even a malformed path is ignored
        cache.read(&ctx, &mut vector).unwrap();
    }

    #[test]
    fn test_malformed_path_is_an_error() {
        let cache = MemCache::lru(1024).unwrap();
        let ctx = IoContext::new();
        let mut vector = request("", 0, 3);
        assert!(matches!(
            cache.read(&ctx, &mut vector),
            Err(Error::InvalidPath(_))
        ));
        assert!(cache.update(&ctx, &fetched("s3:", 0, b"x"), false).is_err());
    }

    #[test]
    fn test_service_prefix_shares_namespace() {
        let cache = MemCache::lru(1024).unwrap();
        let ctx = IoContext::new();
        cache.update(&ctx, &fetched("s3,bucket:obj/1", 0, b"abcd"), false).unwrap();
        assert_eq!(cache.ranges("obj/1"), vec![(0, 4)]);

        let mut vector = request("obj/1", 0, 4);
        cache.read(&ctx, &mut vector).unwrap();
        assert!(vector.is_resolved());
    }

    #[test]
    fn test_uncacheable_entries_skipped() {
        let cache = MemCache::lru(1024).unwrap();
        let ctx = IoContext::new();
        let mut entry = IoEntry::uncached(0, 4);
        entry.resolve(Bytes::from_static(b"abcd"), 4);
        cache.update(&ctx, &IoVector::new("f", vec![entry]), false).unwrap();
        assert!(cache.is_empty());

        cache.update(&ctx, &fetched("f", 0, b"abcd"), false).unwrap();
        let mut vector = IoVector::new("f", vec![IoEntry::uncached(0, 4)]);
        cache.read(&ctx, &mut vector).unwrap();
        assert!(!vector.entries[0].is_done());
    }

    #[test]
    fn test_counters_reported_to_context_and_cache_sinks() {
        let global = Arc::new(CounterSet::new());
        let cache = MemCache::lru(1000)
            .unwrap()
            .with_counter_sinks([Arc::clone(&global) as Arc<dyn CounterSink>]);
        let scoped = Arc::new(CounterSet::new());
        let ctx = IoContext::new().with_sink(scoped.clone());

        cache.update(&ctx, &fetched("f", 0, &[1u8; 100]), false).unwrap();

        let mut vector = IoVector::new("f", vec![IoEntry::new(0, 100), IoEntry::new(100, 100)]);
        cache.read(&ctx, &mut vector).unwrap();

        for set in [&global, &scoped] {
            assert_eq!(set.get(CacheCounter::Read), 2);
            assert_eq!(set.get(CacheCounter::Hit), 1);
            assert_eq!(set.get(CacheCounter::MemoryRead), 2);
            assert_eq!(set.get(CacheCounter::MemoryHit), 1);
            assert_eq!(set.get(CacheCounter::MemoryCapacity), 1000);
            assert_eq!(set.get(CacheCounter::MemoryUsed), 100);
            assert_eq!(set.get(CacheCounter::MemoryAvailable), 900);
        }

        // resolved entries are not probed again
        cache.read(&ctx, &mut vector).unwrap();
        assert_eq!(scoped.get(CacheCounter::MemoryRead), 3);
    }

    #[test]
    fn test_overwrite_does_not_reregister() {
        let cache = MemCache::lru(1000).unwrap();
        let ctx = IoContext::new();
        cache.update(&ctx, &fetched("f", 0, &[1u8; 10]), false).unwrap();
        cache.update(&ctx, &fetched("f", 0, &[2u8; 10]), false).unwrap();

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.entries, 1);
        assert_eq!(snapshot.tracked_ranges, 1);

        let mut vector = request("f", 0, 10);
        cache.read(&ctx, &mut vector).unwrap();
        assert_eq!(vector.entries[0].object.as_deref(), Some(&[2u8; 10][..]));
    }

    #[test]
    fn test_zero_length_key_overwrite_registers_once() {
        let cache = MemCache::lru(1000).unwrap();
        let ctx = IoContext::new();
        for _ in 0..3 {
            let mut entry = IoEntry::new(5, 0);
            entry.resolve(Bytes::from_static(b"meta"), 4);
            cache.update(&ctx, &IoVector::new("f", vec![entry]), false).unwrap();
        }
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.entries, 1);
        assert_eq!(snapshot.tracked_ranges, 1);
        assert_eq!(cache.ranges("f"), vec![(5, 5)]);
    }

    #[test]
    fn test_eviction_unregisters_range() {
        let cache = MemCache::lru(200).unwrap();
        let ctx = IoContext::new();
        cache.update(&ctx, &fetched("f", 0, &[0u8; 100]), false).unwrap();
        cache.update(&ctx, &fetched("f", 100, &[0u8; 100]), false).unwrap();
        cache.update(&ctx, &fetched("g", 0, &[0u8; 100]), false).unwrap();

        assert_eq!(cache.ranges("f"), vec![(100, 200)]);
        assert_eq!(cache.ranges("g"), vec![(0, 100)]);

        // the freed range may now be cached with a different chunking
        cache.update(&ctx, &fetched("f", 0, &[0u8; 50]), false).unwrap();
        assert_eq!(cache.snapshot().tracked_ranges, cache.len());
    }

    #[test]
    fn test_flush_clears_checker() {
        let cache = MemCache::clock(1000).unwrap();
        let ctx = IoContext::new();
        for i in 0..5 {
            cache.update(&ctx, &fetched("f", i * 10, &[0u8; 10]), false).unwrap();
        }
        cache.flush().unwrap();
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.entries, 0);
        assert_eq!(snapshot.tracked_ranges, 0);
        assert_eq!(snapshot.tracked_files, 0);
        assert_eq!(snapshot.used, 0);
    }

    #[test]
    #[should_panic(expected = "overlapping intervals")]
    fn test_overlapping_update_panics() {
        let cache = MemCache::lru(1000).unwrap();
        let ctx = IoContext::new();
        cache.update(&ctx, &fetched("f", 0, &[0u8; 100]), false).unwrap();
        let _ = cache.update(&ctx, &fetched("f", 50, &[0u8; 50]), false);
    }

    #[test]
    fn test_async_update_visible_after_wait() {
        let cache = MemCache::clock(1000).unwrap();
        let ctx = IoContext::new();
        cache.update(&ctx, &fetched("f", 0, b"hello"), true).unwrap();
        cache.wait_for_pending_updates().unwrap();

        let mut vector = request("f", 0, 5);
        cache.read(&ctx, &mut vector).unwrap();
        assert_eq!(vector.entries[0].object.as_deref(), Some(&b"hello"[..]));
        assert_eq!(cache.tracked_ranges(), 1);
    }

    #[test]
    fn test_async_overlap_poisons_cache() {
        for policy in [EvictionPolicy::Lru, EvictionPolicy::Clock] {
            let cache = MemCache::new(MemCacheConfig {
                policy,
                capacity: 1000,
                ..MemCacheConfig::default()
            })
            .unwrap();
            let ctx = IoContext::new();
            cache.update(&ctx, &fetched("f", 0, &[0u8; 100]), true).unwrap();
            cache.update(&ctx, &fetched("f", 50, &[1u8; 50]), true).unwrap();

            assert!(matches!(
                cache.wait_for_pending_updates(),
                Err(Error::UpdateWorkerStopped)
            ));
            assert!(cache.is_poisoned());

            // the rejected range was never stored
            let snapshot = cache.snapshot();
            assert_eq!(snapshot.entries, 1);
            assert_eq!(snapshot.tracked_ranges, 1);
            assert_eq!(cache.ranges("f"), vec![(0, 100)]);

            // nothing is served or stored any more, from any thread
            assert!(matches!(
                cache.update(&ctx, &fetched("g", 0, b"x"), false),
                Err(Error::Poisoned)
            ));
            assert!(matches!(
                cache.update(&ctx, &fetched("g", 0, b"x"), true),
                Err(Error::Poisoned)
            ));
            let mut vector = request("f", 50, 50);
            assert!(matches!(cache.read(&ctx, &mut vector), Err(Error::Poisoned)));
            assert!(vector.entries[0].object.is_none());
            assert!(matches!(cache.flush(), Err(Error::Poisoned)));
            assert_eq!(cache.snapshot().entries, 1);
        }
    }

    #[test]
    fn test_sync_overlap_keeps_cache_and_checker_in_step() {
        let cache = MemCache::lru(1000).unwrap();
        let ctx = IoContext::new();
        cache.update(&ctx, &fetched("f", 0, &[0u8; 100]), false).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.update(&ctx, &fetched("f", 50, &[1u8; 50]), false)
        }));
        assert!(result.is_err());
        assert!(cache.is_poisoned());

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.entries, snapshot.tracked_ranges);
        assert_eq!(snapshot.used, 100);
        let mut vector = request("f", 50, 50);
        assert!(matches!(cache.read(&ctx, &mut vector), Err(Error::Poisoned)));
    }

    #[test]
    fn test_rejected_entry_is_not_tracked() {
        let cache = MemCache::clock(100).unwrap();
        let ctx = IoContext::new();

        let mut empty = IoEntry::new(0, 10);
        empty.resolve(Bytes::new(), 0);
        cache.update(&ctx, &IoVector::new("f", vec![empty]), false).unwrap();
        cache.update(&ctx, &fetched("f", 10, &[0u8; 101]), false).unwrap();

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.entries, 0);
        assert_eq!(snapshot.tracked_ranges, 0);
        assert_eq!(snapshot.tracked_files, 0);

        // the ranges stay free for a later, storable fetch
        cache.update(&ctx, &fetched("f", 0, &[0u8; 10]), false).unwrap();
        assert_eq!(cache.ranges("f"), vec![(0, 10)]);
        assert!(!cache.is_poisoned());
    }
}
