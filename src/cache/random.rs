//! Random Eviction Cache Module
//!
//! Evicts a uniformly random entry when full. No ordering state is kept.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::mem;
use std::num::NonZeroUsize;

use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::debug;

use crate::cache::{CacheStats, EvictionCache, OnItemRemoved};

struct Slot<V> {
    value: V,
    /// Position of the key in `RandomState::keys`
    index: usize,
}

struct RandomState<K, V> {
    entries: HashMap<K, Slot<V>>,
    /// Dense key list so a victim can be drawn in O(1)
    keys: Vec<K>,
    rng: Box<dyn RngCore + Send>,
    stats: CacheStats,
}

impl<K, V> RandomState<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Inserts a key known to be absent, evicting a random entry when full.
    ///
    /// Returns the evicted value so the caller can notify after unlocking.
    fn insert_new(&mut self, capacity: usize, key: K, value: V) -> Option<V> {
        let mut evicted = None;
        let len = self.keys.len();
        if self.entries.len() >= capacity && len > 0 {
            let victim = self.rng.random_range(0..len);
            let victim_key = self.forget_key(victim);
            evicted = self.entries.remove(&victim_key).map(|slot| slot.value);
            self.stats.record_eviction();
            debug!(index = victim, "Random cache evicted entry");
        }

        let index = self.keys.len();
        self.keys.push(key.clone());
        self.entries.insert(key, Slot { value, index });
        evicted
    }

    /// Drops `keys[index]` and repairs the index of the key swapped into its place.
    fn forget_key(&mut self, index: usize) -> K {
        let key = self.keys.swap_remove(index);
        if let Some(moved) = self.keys.get(index) {
            if let Some(slot) = self.entries.get_mut(moved) {
                slot.index = index;
            }
        }
        key
    }
}

// == Random Evict Cache ==
/// Capacity-bounded cache that evicts a random entry.
///
/// Seeded from the operating system by default so eviction choices differ
/// between runs. Use [`with_rng`](RandomEvictCache::with_rng) for a fixed sequence.
pub struct RandomEvictCache<K, V> {
    state: Mutex<RandomState<K, V>>,
    capacity: NonZeroUsize,
    on_item_removed: Option<OnItemRemoved<V>>,
}

impl<K, V> RandomEvictCache<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an empty cache holding at most `capacity` entries.
    pub fn new(capacity: NonZeroUsize, on_item_removed: Option<OnItemRemoved<V>>) -> Self {
        Self::with_rng(capacity, SmallRng::from_os_rng(), on_item_removed)
    }

    /// Creates an empty cache drawing eviction victims from `rng`.
    pub fn with_rng<R>(
        capacity: NonZeroUsize,
        rng: R,
        on_item_removed: Option<OnItemRemoved<V>>,
    ) -> Self
    where
        R: RngCore + Send + 'static,
    {
        Self {
            state: Mutex::new(RandomState {
                entries: HashMap::with_capacity(capacity.get()),
                keys: Vec::with_capacity(capacity.get()),
                rng: Box::new(rng),
                stats: CacheStats::new(),
            }),
            capacity,
            on_item_removed,
        }
    }

    fn notify_evicted(&self, value: V) {
        if let Some(callback) = &self.on_item_removed {
            callback(&value);
        }
    }
}

impl<K, V> EvictionCache<K, V> for RandomEvictCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn try_get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.state.lock();

        let value = state.entries.get(key).map(|slot| slot.value.clone());
        match value {
            Some(_) => state.stats.record_hit(),
            None => state.stats.record_miss(),
        }
        value
    }

    fn set(&self, key: K, value: V) -> Option<V> {
        let mut evicted = None;

        let replaced = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            if let Some(slot) = state.entries.get_mut(&key) {
                Some(mem::replace(&mut slot.value, value))
            } else {
                evicted = state.insert_new(self.capacity.get(), key, value);
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
            let mut state = self.state.lock();
            if state.entries.contains_key(&key) {
                return false;
            }
            state.insert_new(self.capacity.get(), key, value)
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
        let mut state = self.state.lock();

        if !predicate(&state.entries.get(key)?.value) {
            return None;
        }
        let slot = state.entries.remove(key)?;
        state.forget_key(slot.index);
        Some(slot.value)
    }

    fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.state.lock();

        let slot = state.entries.remove(key)?;
        state.forget_key(slot.index);
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
        state.keys.clear();
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

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as TestMutex;
    use rand::rngs::StdRng;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, OnceLock, Weak};

    fn seeded(capacity: usize, seed: u64) -> RandomEvictCache<String, u32> {
        RandomEvictCache::with_rng(NonZeroUsize::new(capacity).unwrap(), StdRng::seed_from_u64(seed), None)
    }

    fn recording(capacity: usize, seed: u64) -> (RandomEvictCache<String, u32>, Arc<TestMutex<Vec<u32>>>) {
        let evicted = Arc::new(TestMutex::new(Vec::new()));
        let sink = evicted.clone();
        let callback: OnItemRemoved<u32> = Arc::new(move |v: &u32| sink.lock().push(*v));
        let cache = RandomEvictCache::with_rng(
            NonZeroUsize::new(capacity).unwrap(),
            StdRng::seed_from_u64(seed),
            Some(callback),
        );
        (cache, evicted)
    }

    #[test]
    fn test_random_set_and_get() {
        let cache = seeded(4, 1);

        cache.set("a".to_string(), 1);
        assert_eq!(cache.try_get("a"), Some(1));
        assert_eq!(cache.try_get("b"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_random_evicts_exactly_one_original() {
        let (cache, evicted) = recording(3, 7);

        for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
            cache.set(key.to_string(), i as u32);
        }

        assert_eq!(cache.len(), 3);
        assert!(cache.contains_key("d"), "new key is inserted after eviction");

        let evicted = evicted.lock().clone();
        assert_eq!(evicted.len(), 1);
        let missing: Vec<&str> = ["a", "b", "c"]
            .into_iter()
            .filter(|k| !cache.contains_key(*k))
            .collect();
        assert_eq!(missing.len(), 1);
        assert_eq!(cache.remove(missing[0]), None);
        assert!(evicted[0] < 3);
    }

    #[test]
    fn test_random_every_entry_can_be_evicted() {
        let keys = ["k0", "k1", "k2", "k3"];
        let mut seen = HashSet::new();

        for trial in 0..200 {
            let (cache, evicted) = recording(keys.len(), trial);
            for (i, key) in keys.iter().enumerate() {
                cache.set(key.to_string(), i as u32);
            }
            cache.set("new".to_string(), 99);

            let evicted = evicted.lock();
            assert_eq!(evicted.len(), 1);
            seen.insert(evicted[0]);
        }

        assert_eq!(seen, (0..keys.len() as u32).collect::<HashSet<_>>());
    }

    #[test]
    fn test_random_replace_is_silent() {
        let (cache, evicted) = recording(1, 3);

        cache.set("a".to_string(), 1);
        assert_eq!(cache.set("a".to_string(), 2), Some(1));
        assert_eq!(cache.try_get("a"), Some(2));
        assert!(evicted.lock().is_empty());
    }

    #[test]
    fn test_random_remove_keeps_indices_consistent() {
        let cache = seeded(8, 11);

        for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
            cache.set(key.to_string(), i as u32);
        }
        assert_eq!(cache.remove("a"), Some(0));
        assert_eq!(cache.remove("c"), Some(2));
        assert_eq!(cache.remove("a"), None);

        // Remaining keys are still removable through their repaired slots
        assert_eq!(cache.remove("d"), Some(3));
        assert_eq!(cache.remove("b"), Some(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_random_clear_is_silent() {
        let (cache, evicted) = recording(2, 5);

        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);
        cache.clear();

        assert!(cache.is_empty());
        assert!(evicted.lock().is_empty());

        cache.set("c".to_string(), 3);
        cache.set("d".to_string(), 4);
        assert_eq!(cache.len(), 2);
        assert!(evicted.lock().is_empty());
    }

    #[test]
    fn test_random_try_insert_only_when_absent() {
        let (cache, evicted) = recording(2, 9);

        assert!(cache.try_insert("a".to_string(), 1));
        assert!(!cache.try_insert("a".to_string(), 2));
        assert_eq!(cache.try_get("a"), Some(1));

        assert!(cache.try_insert("b".to_string(), 3));
        assert!(cache.try_insert("c".to_string(), 4));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains_key("c"));
        assert_eq!(evicted.lock().len(), 1);
    }

    #[test]
    fn test_random_remove_if_keeps_indices_consistent() {
        let cache = seeded(4, 13);
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            cache.set(key.to_string(), i as u32);
        }

        assert_eq!(cache.remove_if("a", |v| *v == 9), None);
        assert_eq!(cache.remove_if("a", |v| *v == 0), Some(0));
        assert_eq!(cache.remove("c"), Some(2));
        assert_eq!(cache.remove("b"), Some(1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_random_callback_can_read_cache() {
        let observed = Arc::new(AtomicUsize::new(0));
        let slot: Arc<OnceLock<Weak<RandomEvictCache<String, u32>>>> = Arc::new(OnceLock::new());

        let (seen, owner) = (observed.clone(), slot.clone());
        let callback: OnItemRemoved<u32> = Arc::new(move |_: &u32| {
            if let Some(cache) = owner.get().and_then(Weak::upgrade) {
                seen.store(cache.len(), Ordering::SeqCst);
            }
        });
        let cache = Arc::new(RandomEvictCache::with_rng(
            NonZeroUsize::new(1).unwrap(),
            StdRng::seed_from_u64(21),
            Some(callback),
        ));
        slot.set(Arc::downgrade(&cache)).unwrap();

        cache.set("a".to_string(), 1);
        cache.set("b".to_string(), 2);

        // The callback ran after the new key was in place and did not deadlock
        assert_eq!(observed.load(Ordering::SeqCst), 1);
        assert_eq!(cache.try_get("b"), Some(2));
    }

    #[test]
    fn test_random_default_rng_respects_capacity() {
        let cache: RandomEvictCache<String, u32> =
            RandomEvictCache::new(NonZeroUsize::new(5).unwrap(), None);

        for i in 0..50 {
            cache.set(format!("key{}", i), i);
            assert!(cache.len() <= 5);
        }
        assert_eq!(cache.stats().evictions, 45);
    }
}
