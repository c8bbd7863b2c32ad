//! Error types for rangecache
//!
//! Ordinary errors (bad configuration, malformed paths) are returned to the
//! caller. Invariant violations (overlapping or untracked ranges) are also
//! represented here so the checker can describe them, but the cache facade
//! escalates them instead of returning them.

use std::fmt::Write;
use thiserror::Error;

/// Common result type for rangecache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for rangecache
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid range [{low} {high})")]
    InvalidRange { low: u64, high: u64 },

    #[error(
        "duplicate key range found in {tag} when inserting [{low} {high}). \
         The key {namespace} contains overlapping intervals {}",
        format_ranges(.overlaps)
    )]
    OverlappingRange {
        tag: String,
        namespace: String,
        low: u64,
        high: u64,
        overlaps: Vec<(u64, u64)>,
    },

    #[error("key range [{low} {high}) of {namespace} not found for removal in {tag}")]
    RangeNotTracked {
        tag: String,
        namespace: String,
        low: u64,
        high: u64,
    },

    #[error("cache update worker has stopped")]
    UpdateWorkerStopped,

    #[error("memory cache is unusable after an invariant violation")]
    Poisoned,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid path error
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Check if this error means the cache bookkeeping itself is broken.
    ///
    /// Such errors have no safe continuation; callers escalate them.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::OverlappingRange { .. } | Self::RangeNotTracked { .. }
        )
    }

    /// Check if this is a configuration error
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

fn format_ranges(ranges: &[(u64, u64)]) -> String {
    let mut out = String::new();
    for (low, high) in ranges {
        let _ = write!(out, "[{low} {high}), ");
    }
    out
}
