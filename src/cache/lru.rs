//! LRU Cache Module
//!
//! Least Recently Used eviction: recency tracking plus the cache built on it.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::mem;
use std::num::NonZeroUsize;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{CacheStats, EvictionCache, OnItemRemoved};

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// Every touch hands out a strictly increasing stamp, so the smallest stamp
/// is always the least recently used key and no two keys ever tie.
#[derive(Debug)]
pub struct LruTracker<K> {
    /// Keys ordered by their last access stamp
    order: BTreeMap<u64, K>,
    next_stamp: u64,
}

impl<K> LruTracker<K> {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self {
            order: BTreeMap::new(),
            next_stamp: 0,
        }
    }

    // == Push ==
    /// Records `key` as the most recently used and returns its stamp.
    pub fn push(&mut self, key: K) -> u64 {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.order.insert(stamp, key);
        stamp
    }

    // == Touch ==
    /// Moves the key holding `stamp` to the front and returns its new stamp.
    ///
    /// Returns None if no key holds `stamp`.
    pub fn touch(&mut self, stamp: u64) -> Option<u64> {
        let key = self.order.remove(&stamp)?;
        Some(self.push(key))
    }

    // == Remove ==
    /// Forgets the key holding `stamp`.
    pub fn remove(&mut self, stamp: u64) -> Option<K> {
        self.order.remove(&stamp)
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<K> {
        self.order.pop_first().map(|(_, key)| key)
    }

    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.first_key_value().map(|(_, key)| key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }
}

impl<K> Default for LruTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

// == LRU Cache ==
struct Slot<V> {
    value: V,
    stamp: u64,
}

struct LruState<K, V> {
    entries: HashMap<K, Slot<V>>,
    lru: LruTracker<K>,
    stats: CacheStats,
}

/// Capacity-bounded cache that evicts the least recently used key.
///
/// Both `try_get` and `set` count as a use.
pub struct LruCache<K, V> {
    state: Mutex<LruState<K, V>>,
    capacity: NonZeroUsize,
    on_item_removed: Option<OnItemRemoved<V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` entries.
    pub fn new(capacity: NonZeroUsize, on_item_removed: Option<OnItemRemoved<V>>) -> Self {
        Self {
            state: Mutex::new(LruState {
                entries: HashMap::with_capacity(capacity.get()),
                lru: LruTracker::new(),
                stats: CacheStats::new(),
            }),
            capacity,
            on_item_removed,
        }
    }

    /// Inserts a key known to be absent, evicting the oldest entry when full.
    ///
    /// Returns the evicted value so the caller can notify after unlocking.
    fn insert_new(&self, state: &mut LruState<K, V>, key: K, value: V) -> Option<V> {
        let mut evicted = None;
        if state.entries.len() >= self.capacity.get() {
            if let Some(oldest) = state.lru.evict_oldest() {
                evicted = state.entries.remove(&oldest).map(|slot| slot.value);
                state.stats.record_eviction();
                debug!(remaining = state.entries.len(), "LRU cache evicted oldest entry");
            }
        }

        let stamp = state.lru.push(key.clone());
        state.entries.insert(key, Slot { value, stamp });
        evicted
    }

    fn notify_evicted(&self, value: V) {
        if let Some(callback) = &self.on_item_removed {
            callback(&value);
        }
    }
}

impl<K, V> EvictionCache<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn try_get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        match state.entries.get_mut(key) {
            Some(slot) => {
                if let Some(stamp) = state.lru.touch(slot.stamp) {
                    slot.stamp = stamp;
                }
                state.stats.record_hit();
                Some(slot.value.clone())
            }
            None => {
                state.stats.record_miss();
                None
            }
        }
    }

    fn set(&self, key: K, value: V) -> Option<V> {
        let mut evicted = None;

        let replaced = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            if let Some(slot) = state.entries.get_mut(&key) {
                // Overwrite: refresh recency, no notification
                if let Some(stamp) = state.lru.touch(slot.stamp) {
                    slot.stamp = stamp;
                }
                Some(mem::replace(&mut slot.value, value))
            } else {
                evicted = self.insert_new(state, key, value);
                None
            }
        };

        if let Some(value) = evicted {
            self.notify_evicted(value);
        }

        replaced
    }

    fn try_insert(&self, key: K, value: V) -> bool {
        let evicted = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            if state.entries.contains_key(&key) {
                return false;
            }
            self.insert_new(state, key, value)
        };

        if let Some(value) = evicted {
            self.notify_evicted(value);
        }
        true
    }

    fn remove_if<Q, F>(&self, key: &Q, predicate: F) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> bool,
    {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if !predicate(&state.entries.get(key)?.value) {
            return None;
        }
        let slot = state.entries.remove(key)?;
        state.lru.remove(slot.stamp);
        Some(slot.value)
    }

    fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let slot = state.entries.remove(key)?;
        state.lru.remove(slot.stamp);
        Some(slot.value)
    }

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state.lock().entries.contains_key(key)
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.lru.clear();
    }

    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity.get()
    }

    fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        state.stats.snapshot(state.entries.len())
    }
}
