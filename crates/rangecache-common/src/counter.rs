//! Cache counters and the sinks that receive them
//!
//! The memory cache accumulates its per-call numbers locally and hands them to
//! every sink in scope once the call finishes. Sinks only need add and swap
//! semantics; accounting is monotonic but not linearizable with cache
//! mutation.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters reported by the memory cache
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheCounter {
    /// Entries probed across all cache tiers
    Read,
    /// Hits across all cache tiers
    Hit,
    /// Entries probed in the memory cache
    MemoryRead,
    /// Hits in the memory cache
    MemoryHit,
    /// Configured memory cache capacity in bytes
    MemoryCapacity,
    /// Bytes currently held by the memory cache
    MemoryUsed,
    /// Bytes still free in the memory cache
    MemoryAvailable,
}

impl CacheCounter {
    pub const ALL: [Self; 7] = [
        Self::Read,
        Self::Hit,
        Self::MemoryRead,
        Self::MemoryHit,
        Self::MemoryCapacity,
        Self::MemoryUsed,
        Self::MemoryAvailable,
    ];

    /// Exported metric name
    #[must_use]
    pub fn metric_name(&self) -> &'static str {
        match self {
            Self::Read => "rangecache_cache_read_total",
            Self::Hit => "rangecache_cache_hit_total",
            Self::MemoryRead => "rangecache_memory_cache_read_total",
            Self::MemoryHit => "rangecache_memory_cache_hit_total",
            Self::MemoryCapacity => "rangecache_memory_cache_capacity_bytes",
            Self::MemoryUsed => "rangecache_memory_cache_used_bytes",
            Self::MemoryAvailable => "rangecache_memory_cache_available_bytes",
        }
    }

    /// Whether the counter is a gauge (swapped) rather than a running total
    #[must_use]
    pub fn is_gauge(&self) -> bool {
        matches!(
            self,
            Self::MemoryCapacity | Self::MemoryUsed | Self::MemoryAvailable
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Destination for cache counter updates
pub trait CounterSink: Send + Sync + fmt::Debug {
    /// Add `delta` to a running total
    fn add(&self, counter: CacheCounter, delta: u64);

    /// Replace the current value, returning the previous one if known
    fn swap(&self, counter: CacheCounter, value: u64) -> u64;
}

/// In-memory counter set
#[derive(Debug, Default)]
pub struct CounterSet {
    values: [AtomicU64; 7],
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter
    pub fn get(&self, counter: CacheCounter) -> u64 {
        self.values[counter.index()].load(Ordering::Relaxed)
    }

    /// Memory cache hit ratio (0.0 to 1.0)
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let reads = self.get(CacheCounter::MemoryRead);
        if reads == 0 {
            return 0.0;
        }
        self.get(CacheCounter::MemoryHit) as f64 / reads as f64
    }

    /// Reset all counters
    pub fn reset(&self) {
        for value in &self.values {
            value.store(0, Ordering::Relaxed);
        }
    }
}

impl CounterSink for CounterSet {
    fn add(&self, counter: CacheCounter, delta: u64) {
        self.values[counter.index()].fetch_add(delta, Ordering::Relaxed);
    }

    fn swap(&self, counter: CacheCounter, value: u64) -> u64 {
        self.values[counter.index()].swap(value, Ordering::Relaxed)
    }
}

/// Forwards counters to the `metrics` facade
///
/// Nothing is exported unless the process installs a recorder.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsSink;

impl CounterSink for MetricsSink {
    fn add(&self, counter: CacheCounter, delta: u64) {
        metrics::counter!(counter.metric_name()).increment(delta);
    }

    #[allow(clippy::cast_precision_loss)]
    fn swap(&self, counter: CacheCounter, value: u64) -> u64 {
        // gauges cannot be read back through the facade
        metrics::gauge!(counter.metric_name()).set(value as f64);
        0
    }
}

/// Per-call scope for counter updates
#[derive(Clone, Debug, Default)]
pub struct IoContext {
    sinks: Vec<Arc<dyn CounterSink>>,
}

impl IoContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a sink that receives this call's counters
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn CounterSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn sinks(&self) -> &[Arc<dyn CounterSink>] {
        &self.sinks
    }
}
