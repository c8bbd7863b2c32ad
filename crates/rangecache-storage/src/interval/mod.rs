//! Interval bookkeeping for cached byte ranges
//!
//! - [`IntervalTree`]: augmented AVL tree answering overlap queries
//! - [`OverlapChecker`]: per-file non-overlap enforcement built on it

mod overlap;
mod tree;

pub use overlap::OverlapChecker;
pub use tree::{Interval, IntervalTree};
