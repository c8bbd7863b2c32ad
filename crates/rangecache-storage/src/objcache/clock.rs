//! Clock (second-chance) object cache
//!
//! Entries occupy slots of a circular array swept by a hand. A hit only sets
//! the slot's reference bit. To make room the hand advances, clearing set
//! bits, and evicts the first occupied slot whose bit is already clear.
//!
//! The array grows when every slot is occupied and reuses freed slots after
//! that, so its length tracks the peak entry count. Every entry accounts for
//! at least one byte, which bounds that count by the capacity in bytes.

use super::{CacheStats, EvictionListener, ObjectCache, ObjectKey};
use bytes::Bytes;
use parking_lot::Mutex;
use rangecache_common::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{trace, warn};

struct ClockSlot<K> {
    key: K,
    value: Bytes,
    size: u64,
    referenced: bool,
}

struct ClockState<K> {
    slots: Vec<Option<ClockSlot<K>>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    hand: usize,
    used: u64,
    capacity: u64,
}

impl<K: ObjectKey> ClockState<K> {
    fn new(capacity: u64) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            hand: 0,
            used: 0,
            capacity,
        }
    }

    /// Sweep from the hand and take out one victim, never `protected`
    fn evict_one(&mut self, protected: Option<usize>) -> Option<ClockSlot<K>> {
        let candidates = self.index.len() - usize::from(protected.is_some());
        if candidates == 0 {
            return None;
        }
        loop {
            if self.hand >= self.slots.len() {
                self.hand = 0;
            }
            let idx = self.hand;
            self.hand += 1;
            if Some(idx) == protected {
                continue;
            }
            let Some(slot) = self.slots[idx].as_mut() else {
                continue;
            };
            if slot.referenced {
                slot.referenced = false;
                continue;
            }
            let victim = self.slots[idx].take()?;
            self.free.push(idx);
            self.index.remove(&victim.key);
            self.used = self.used.saturating_sub(victim.size);
            return Some(victim);
        }
    }

    fn place(&mut self, slot: ClockSlot<K>) -> usize {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(slot);
            idx
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        }
    }
}

/// Second-chance object cache with a byte budget
pub struct ClockCache<K> {
    state: Mutex<ClockState<K>>,
    listener: Arc<dyn EvictionListener<K>>,
    stats: CacheStats,
}

impl<K: ObjectKey> ClockCache<K> {
    /// Create a new clock cache holding at most `capacity` bytes
    pub fn new(capacity: u64, listener: Arc<dyn EvictionListener<K>>) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::configuration("clock cache capacity must be positive"));
        }
        Ok(Self {
            state: Mutex::new(ClockState::new(capacity)),
            listener,
            stats: CacheStats::default(),
        })
    }

    fn evict(&self, slot: &ClockSlot<K>) {
        trace!(key = ?slot.key, size = slot.size, "clock evict");
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        self.listener.on_evict(&slot.key, &slot.value, slot.size);
    }

    /// Whether `key` currently has its reference bit set
    pub fn is_referenced(&self, key: &K) -> Option<bool> {
        let state = self.state.lock();
        let idx = *state.index.get(key)?;
        state.slots[idx].as_ref().map(|slot| slot.referenced)
    }
}

impl<K: ObjectKey> ObjectCache<K> for ClockCache<K> {
    fn get(&self, key: &K, preloading: bool) -> Option<(Bytes, u64)> {
        let mut state = self.state.lock();
        let found = state.index.get(key).copied().and_then(|idx| {
            let slot = state.slots[idx].as_mut()?;
            if !preloading {
                slot.referenced = true;
            }
            Some((slot.value.clone(), slot.size))
        });
        self.stats.record_get(found.is_some());
        found
    }

    fn set(&self, key: K, value: Bytes, size: u64, preloading: bool) -> bool {
        let mut state = self.state.lock();
        // zero-sized entries would never make room for anything
        if size == 0 || size > state.capacity {
            warn!(key = ?key, size, capacity = state.capacity, "entry size outside clock cache bounds");
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        if let Some(idx) = state.index.get(&key).copied() {
            let old_size = match state.slots[idx].as_mut() {
                Some(slot) => {
                    slot.value = value;
                    slot.referenced = true;
                    std::mem::replace(&mut slot.size, size)
                }
                None => return false,
            };
            state.used = state.used.saturating_sub(old_size).saturating_add(size);
            while state.used > state.capacity {
                match state.evict_one(Some(idx)) {
                    Some(victim) => self.evict(&victim),
                    None => break,
                }
            }
            return false;
        }

        while state.used.saturating_add(size) > state.capacity {
            match state.evict_one(None) {
                Some(victim) => self.evict(&victim),
                None => break,
            }
        }

        // speculative entries get one sweep of grace
        let idx = state.place(ClockSlot {
            key: key.clone(),
            value,
            size,
            referenced: preloading,
        });
        state.index.insert(key, idx);
        state.used = state.used.saturating_add(size).min(state.capacity);
        true
    }

    fn flush(&self) {
        let mut state = self.state.lock();
        let slots = std::mem::take(&mut state.slots);
        for slot in slots.into_iter().flatten() {
            self.evict(&slot);
        }
        state.free.clear();
        state.index.clear();
        state.hand = 0;
        state.used = 0;
    }

    fn capacity(&self) -> u64 {
        self.state.lock().capacity
    }

    fn used(&self) -> u64 {
        self.state.lock().used
    }

    fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl<K> fmt::Debug for ClockCache<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ClockCache")
            .field("entries", &state.index.len())
            .field("slots", &state.slots.len())
            .field("hand", &state.hand)
            .field("used", &state.used)
            .field("capacity", &state.capacity)
            .finish()
    }
}
