//! Per-file non-overlap checking for cached byte ranges
//!
//! One [`IntervalTree`] is kept per namespace (file path). Byte ranges cached
//! for the same file must never overlap; if they do, the upstream chunking is
//! broken and the checker reports every conflicting range.

use super::tree::{Interval, IntervalTree};
use rangecache_common::{Error, Result};
use std::collections::HashMap;

/// Tracks the byte ranges registered under each namespace
#[derive(Debug)]
pub struct OverlapChecker {
    /// Name used in diagnostics
    tag: String,
    key_intervals: HashMap<String, IntervalTree<()>>,
}

impl OverlapChecker {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            key_intervals: HashMap::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Register `[low, high)` under `key`, failing if it overlaps a registered range
    pub fn insert(&mut self, key: &str, low: u64, high: u64) -> Result<()> {
        if low > high {
            return Err(Error::InvalidRange { low, high });
        }
        let interval = Interval::new(low, high);

        if let Some(tree) = self.key_intervals.get_mut(key) {
            if tree.intersects(&interval) {
                let overlaps = tree
                    .stab(&interval)
                    .into_iter()
                    .map(|(i, _)| (i.low, i.high))
                    .collect();
                return Err(Error::OverlappingRange {
                    tag: self.tag.clone(),
                    namespace: key.to_string(),
                    low,
                    high,
                    overlaps,
                });
            }
            tree.insert(interval, ());
        } else {
            let mut tree = IntervalTree::new();
            tree.insert(interval, ());
            self.key_intervals.insert(key.to_string(), tree);
        }
        Ok(())
    }

    /// Unregister `[low, high)` from `key`
    ///
    /// A namespace whose last range is removed is dropped entirely.
    pub fn remove(&mut self, key: &str, low: u64, high: u64) -> Result<()> {
        let removed = match self.key_intervals.get_mut(key) {
            Some(tree) => {
                let removed = tree.delete(&Interval::new(low, high));
                if tree.is_empty() {
                    self.key_intervals.remove(key);
                }
                removed
            }
            None => None,
        };

        removed.ok_or_else(|| Error::RangeNotTracked {
            tag: self.tag.clone(),
            namespace: key.to_string(),
            low,
            high,
        })
    }

    /// True if `[low, high)` is registered exactly under `key`
    pub fn contains(&self, key: &str, low: u64, high: u64) -> bool {
        let interval = Interval::new(low, high);
        self.key_intervals
            .get(key)
            .is_some_and(|tree| tree.get(&interval).is_some())
    }

    /// Number of namespaces with at least one registered range
    pub fn namespace_count(&self) -> usize {
        self.key_intervals.len()
    }

    /// Total number of registered ranges across all namespaces
    pub fn range_count(&self) -> usize {
        self.key_intervals.values().map(IntervalTree::len).sum()
    }

    /// Ranges registered under `key`, in ascending order
    pub fn ranges(&self, key: &str) -> Vec<(u64, u64)> {
        self.key_intervals.get(key).map_or_else(Vec::new, |tree| {
            tree.intervals().into_iter().map(|i| (i.low, i.high)).collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_rejected_with_details() {
        let mut checker = OverlapChecker::new("test");
        checker.insert("f", 0, 100).unwrap();

        let err = checker.insert("f", 50, 100).unwrap_err();
        assert!(err.is_invariant_violation());
        match &err {
            Error::OverlappingRange {
                namespace,
                low,
                high,
                overlaps,
                ..
            } => {
                assert_eq!(namespace, "f");
                assert_eq!((*low, *high), (50, 100));
                assert_eq!(overlaps, &vec![(0, 100)]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("[0 100)"));
        assert_eq!(checker.range_count(), 1);
    }

    #[test]
    fn test_namespaces_are_independent() {
        let mut checker = OverlapChecker::new("test");
        checker.insert("a", 0, 100).unwrap();
        checker.insert("b", 0, 100).unwrap();
        checker.insert("a", 100, 200).unwrap();
        assert_eq!(checker.namespace_count(), 2);
        assert_eq!(checker.ranges("a"), vec![(0, 100), (100, 200)]);
    }

    #[test]
    fn test_remove_drops_empty_namespace() {
        let mut checker = OverlapChecker::new("test");
        checker.insert("f", 0, 10).unwrap();
        checker.insert("f", 10, 20).unwrap();

        checker.remove("f", 0, 10).unwrap();
        assert_eq!(checker.namespace_count(), 1);
        assert!(checker.contains("f", 10, 20));
        assert!(!checker.contains("f", 0, 10));

        checker.remove("f", 10, 20).unwrap();
        assert_eq!(checker.namespace_count(), 0);

        // the freed range can be registered again
        checker.insert("f", 5, 15).unwrap();
    }

    #[test]
    fn test_remove_untracked() {
        let mut checker = OverlapChecker::new("test");
        let err = checker.remove("missing", 0, 10).unwrap_err();
        assert!(matches!(err, Error::RangeNotTracked { .. }));

        checker.insert("f", 0, 10).unwrap();
        assert!(checker.remove("f", 0, 5).is_err());
        assert_eq!(checker.range_count(), 1);
    }

    #[test]
    fn test_zero_length_range() {
        let mut checker = OverlapChecker::new("test");
        checker.insert("f", 5, 5).unwrap();

        // touching neighbours on either side are fine
        checker.insert("f", 0, 5).unwrap();
        checker.insert("f", 5, 10).unwrap();
        assert_eq!(checker.ranges("f"), vec![(0, 5), (5, 5), (5, 10)]);
        assert!(checker.contains("f", 5, 5));
        assert!(!checker.contains("f", 6, 6));

        // a range strictly containing the point conflicts with it
        let mut checker = OverlapChecker::new("test");
        checker.insert("f", 5, 5).unwrap();
        match checker.insert("f", 0, 10).unwrap_err() {
            Error::OverlappingRange { overlaps, .. } => assert_eq!(overlaps, vec![(5, 5)]),
            other => panic!("unexpected error {other:?}"),
        }

        checker.remove("f", 5, 5).unwrap();
        assert_eq!(checker.namespace_count(), 0);
    }

    #[test]
    fn test_invalid_range() {
        let mut checker = OverlapChecker::new("test");
        assert!(matches!(
            checker.insert("f", 10, 5),
            Err(Error::InvalidRange { low: 10, high: 5 })
        ));
        assert_eq!(checker.namespace_count(), 0);
    }
}
