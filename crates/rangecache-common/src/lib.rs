//! rangecache common - shared types and utilities
//!
//! This crate provides the data model (cache keys, file paths, IO vectors),
//! the error type, configuration and counter sinks used by the byte-range
//! cache and its tools.

pub mod config;
pub mod counter;
pub mod error;
pub mod types;
pub mod vector;

pub use config::{EvictionPolicy, MemCacheConfig};
pub use counter::{CacheCounter, CounterSet, CounterSink, IoContext, MetricsSink};
pub use error::{Error, Result};
pub use types::{CacheKey, FilePath};
pub use vector::{IoEntry, IoVector};
