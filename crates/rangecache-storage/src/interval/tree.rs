//! Augmented AVL interval tree
//!
//! Stores half-open `[low, high)` intervals ordered by `(low, high)`. Every
//! node also records the largest `high` in its subtree so overlap queries can
//! skip whole subtrees, which keeps them at O(log n + k) for k results.
//! Identical intervals may be stored more than once.

use std::cmp::Ordering;
use std::fmt;

/// Half-open interval `[low, high)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    pub low: u64,
    pub high: u64,
}

impl Interval {
    #[must_use]
    pub const fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }

    /// Half-open overlap test
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.low < other.high && other.low < self.high
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {})", self.low, self.high)
    }
}

type Link<V> = Option<Box<Node<V>>>;

struct Node<V> {
    interval: Interval,
    value: V,
    /// Largest `high` in this subtree
    max_high: u64,
    height: i32,
    left: Link<V>,
    right: Link<V>,
}

impl<V> Node<V> {
    fn leaf(interval: Interval, value: V) -> Box<Self> {
        Box::new(Self {
            interval,
            value,
            max_high: interval.high,
            height: 1,
            left: None,
            right: None,
        })
    }

    fn update(&mut self) {
        self.height = 1 + height(self.left.as_deref()).max(height(self.right.as_deref()));
        self.max_high = self
            .interval
            .high
            .max(max_high(self.left.as_deref()))
            .max(max_high(self.right.as_deref()));
    }

    fn balance_factor(&self) -> i32 {
        height(self.left.as_deref()) - height(self.right.as_deref())
    }
}

fn height<V>(node: Option<&Node<V>>) -> i32 {
    node.map_or(0, |n| n.height)
}

fn max_high<V>(node: Option<&Node<V>>) -> u64 {
    node.map_or(0, |n| n.max_high)
}

fn rotate_right<V>(mut node: Box<Node<V>>) -> Box<Node<V>> {
    match node.left.take() {
        Some(mut pivot) => {
            node.left = pivot.right.take();
            node.update();
            pivot.right = Some(node);
            pivot.update();
            pivot
        }
        None => node,
    }
}

fn rotate_left<V>(mut node: Box<Node<V>>) -> Box<Node<V>> {
    match node.right.take() {
        Some(mut pivot) => {
            node.right = pivot.left.take();
            node.update();
            pivot.left = Some(node);
            pivot.update();
            pivot
        }
        None => node,
    }
}

fn rebalance<V>(mut node: Box<Node<V>>) -> Box<Node<V>> {
    node.update();
    let balance = node.balance_factor();
    if balance > 1 {
        if node.left.as_ref().is_some_and(|l| l.balance_factor() < 0) {
            node.left = node.left.take().map(rotate_left);
        }
        return rotate_right(node);
    }
    if balance < -1 {
        if node.right.as_ref().is_some_and(|r| r.balance_factor() > 0) {
            node.right = node.right.take().map(rotate_right);
        }
        return rotate_left(node);
    }
    node
}

fn insert_node<V>(link: Link<V>, interval: Interval, value: V) -> Box<Node<V>> {
    let Some(mut node) = link else {
        return Node::leaf(interval, value);
    };
    // equal intervals go right so insertion order is kept in-order
    if interval < node.interval {
        node.left = Some(insert_node(node.left.take(), interval, value));
    } else {
        node.right = Some(insert_node(node.right.take(), interval, value));
    }
    rebalance(node)
}

/// Detach the leftmost node of a subtree, returning the rest and the node
fn take_min<V>(mut node: Box<Node<V>>) -> (Link<V>, Box<Node<V>>) {
    match node.left.take() {
        Some(left) => {
            let (rest, min) = take_min(left);
            node.left = rest;
            (Some(rebalance(node)), min)
        }
        None => (node.right.take(), node),
    }
}

fn delete_node<V>(link: Link<V>, interval: &Interval) -> (Link<V>, Option<V>) {
    let Some(mut node) = link else {
        return (None, None);
    };
    match interval.cmp(&node.interval) {
        Ordering::Less => {
            let (left, removed) = delete_node(node.left.take(), interval);
            node.left = left;
            (Some(rebalance(node)), removed)
        }
        Ordering::Greater => {
            let (right, removed) = delete_node(node.right.take(), interval);
            node.right = right;
            (Some(rebalance(node)), removed)
        }
        Ordering::Equal => {
            let Node {
                value, left, right, ..
            } = *node;
            let replacement = match (left, right) {
                (None, None) => None,
                (Some(child), None) | (None, Some(child)) => Some(child),
                (Some(left), Some(right)) => {
                    let (rest, mut successor) = take_min(right);
                    successor.left = Some(left);
                    successor.right = rest;
                    Some(rebalance(successor))
                }
            };
            (replacement, Some(value))
        }
    }
}

fn find_exact<'a, V>(mut node: Option<&'a Node<V>>, interval: &Interval) -> Option<&'a V> {
    while let Some(n) = node {
        node = match interval.cmp(&n.interval) {
            Ordering::Less => n.left.as_deref(),
            Ordering::Greater => n.right.as_deref(),
            Ordering::Equal => return Some(&n.value),
        };
    }
    None
}

fn any_overlap<V>(node: Option<&Node<V>>, query: &Interval) -> bool {
    let Some(node) = node else {
        return false;
    };
    if node.max_high <= query.low {
        return false;
    }
    if node.interval.overlaps(query) || any_overlap(node.left.as_deref(), query) {
        return true;
    }
    // everything to the right starts at or after this node
    if node.interval.low >= query.high {
        return false;
    }
    any_overlap(node.right.as_deref(), query)
}

fn collect_overlaps<'a, V>(
    node: Option<&'a Node<V>>,
    query: &Interval,
    out: &mut Vec<(Interval, &'a V)>,
) {
    let Some(node) = node else {
        return;
    };
    if node.max_high <= query.low {
        return;
    }
    collect_overlaps(node.left.as_deref(), query, out);
    if node.interval.overlaps(query) {
        out.push((node.interval, &node.value));
    }
    if node.interval.low < query.high {
        collect_overlaps(node.right.as_deref(), query, out);
    }
}

/// Balanced interval tree keyed by half-open intervals
pub struct IntervalTree<V> {
    root: Link<V>,
    len: usize,
}

impl<V> Default for IntervalTree<V> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<V> IntervalTree<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored intervals
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add an interval; identical intervals are kept as distinct entries
    pub fn insert(&mut self, interval: Interval, value: V) {
        self.root = Some(insert_node(self.root.take(), interval, value));
        self.len += 1;
    }

    /// Remove one entry exactly matching `interval`, returning its value
    pub fn delete(&mut self, interval: &Interval) -> Option<V> {
        let (root, removed) = delete_node(self.root.take(), interval);
        self.root = root;
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Value of an entry exactly matching `interval`
    pub fn get(&self, interval: &Interval) -> Option<&V> {
        find_exact(self.root.as_deref(), interval)
    }

    /// True if any stored interval overlaps `query`
    pub fn intersects(&self, query: &Interval) -> bool {
        any_overlap(self.root.as_deref(), query)
    }

    /// All stored intervals overlapping `query`, in ascending order
    pub fn stab(&self, query: &Interval) -> Vec<(Interval, &V)> {
        let mut out = Vec::new();
        collect_overlaps(self.root.as_deref(), query, &mut out);
        out
    }

    /// All stored intervals in ascending order
    pub fn intervals(&self) -> Vec<Interval> {
        fn walk<V>(node: Option<&Node<V>>, out: &mut Vec<Interval>) {
            if let Some(node) = node {
                walk(node.left.as_deref(), out);
                out.push(node.interval);
                walk(node.right.as_deref(), out);
            }
        }
        let mut out = Vec::with_capacity(self.len);
        walk(self.root.as_deref(), &mut out);
        out
    }

    /// Height of the tree (0 when empty)
    pub fn height(&self) -> usize {
        usize::try_from(height(self.root.as_deref())).unwrap_or_default()
    }
}

impl<V> fmt::Debug for IntervalTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntervalTree")
            .field("len", &self.len)
            .field("height", &self.height())
            .finish()
    }
}
