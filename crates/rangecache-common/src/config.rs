//! Configuration types for the memory cache
//!
//! All values are fixed at construction time; nothing here is mutable once a
//! cache has been built from it.

use crate::error::{Error, Result};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default cache capacity (512 MB)
pub const DEFAULT_CAPACITY: u64 = 512 * 1024 * 1024;

/// Default depth of the asynchronous update queue
pub const DEFAULT_QUEUE_DEPTH: usize = 65536;

/// Eviction policy backing the object cache
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Exact least-recently-used ordering
    #[default]
    #[display("lru")]
    Lru,
    /// Second-chance approximation of LRU
    #[display("clock")]
    Clock,
}

impl EvictionPolicy {
    /// Tag used to name the overlap checker in diagnostics
    #[must_use]
    pub fn checker_tag(&self) -> &'static str {
        match self {
            Self::Lru => "MemCache_LRU",
            Self::Clock => "MemCache_Clock",
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(Self::Lru),
            "clock" => Ok(Self::Clock),
            other => Err(Error::configuration(format!(
                "unknown eviction policy {other:?}, expected \"lru\" or \"clock\""
            ))),
        }
    }
}

/// Memory cache configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MemCacheConfig {
    /// Eviction policy
    pub policy: EvictionPolicy,
    /// Capacity in bytes
    pub capacity: u64,
    /// Maximum number of queued asynchronous updates before callers block
    pub queue_depth: usize,
}

impl Default for MemCacheConfig {
    fn default() -> Self {
        Self {
            policy: EvictionPolicy::default(),
            capacity: DEFAULT_CAPACITY,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl MemCacheConfig {
    /// LRU cache with the given capacity
    #[must_use]
    pub fn lru(capacity: u64) -> Self {
        Self {
            policy: EvictionPolicy::Lru,
            capacity,
            ..Self::default()
        }
    }

    /// Clock cache with the given capacity
    #[must_use]
    pub fn clock(capacity: u64) -> Self {
        Self {
            policy: EvictionPolicy::Clock,
            capacity,
            ..Self::default()
        }
    }

    /// Override the asynchronous queue depth
    #[must_use]
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Reject values that can never produce a working cache
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::configuration("cache capacity must be positive"));
        }
        if self.queue_depth == 0 {
            return Err(Error::configuration("update queue depth must be positive"));
        }
        Ok(())
    }
}
