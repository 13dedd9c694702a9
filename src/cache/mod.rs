//! Cache Module
//!
//! Capacity-bounded key/value caches with pluggable eviction.
//!
//! Both variants guard their state with a single mutex, so eviction and the
//! insert that triggered it happen as one step. The removal callback runs
//! after that lock is released, on the thread that called `set`.

mod lru;
mod random;
mod stats;


use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

// Re-export public types
pub use lru::{LruCache, LruTracker};
pub use random::RandomEvictCache;
pub use stats::CacheStats;

use crate::config::EvictionPolicy;

/// Callback invoked with each value evicted by capacity pressure.
///
/// Runs after the cache's lock is released, so it may read the same cache.
/// Keep it cheap: it runs on the thread whose insert caused the eviction.
pub type OnItemRemoved<V> = Arc<dyn Fn(&V) + Send + Sync>;

// == Eviction Cache Contract ==
/// Operations shared by every eviction cache variant.
///
/// Only capacity-driven eviction reports through [`OnItemRemoved`];
/// replacing a key, `remove` and `clear` are silent.
pub trait EvictionCache<K, V>: Send + Sync
where
    K: Eq + Hash,
{
    /// Looks up a value. LRU marks the key as most recently used.
    fn try_get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Inserts or replaces a value, returning the replaced one.
    ///
    /// A new key arriving at a full cache evicts exactly one entry first.
    fn set(&self, key: K, value: V) -> Option<V>;

    /// Inserts a value only if the key is absent, as one atomic step.
    ///
    /// Returns false and drops `value` if the key is already cached. A new
    /// key arriving at a full cache evicts exactly one entry first.
    fn try_insert(&self, key: K, value: V) -> bool;

    /// Removes a value without notifying the removal callback.
    fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Removes a value only if `predicate` accepts the stored one.
    ///
    /// The check and the removal happen under one lock. Silent, like `remove`.
    fn remove_if<Q, F>(&self, key: &Q, predicate: F) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> bool;

    /// Checks for a key without touching recency or statistics.
    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized;

    /// Drops every entry without notifying the removal callback.
    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    fn stats(&self) -> CacheStats;
}

// == Eviction Store ==
/// An eviction cache whose variant was picked once from an [`EvictionPolicy`].
pub enum EvictionStore<K, V> {
    Lru(LruCache<K, V>),
    Random(RandomEvictCache<K, V>),
}

impl<K, V> EvictionStore<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    /// Builds the variant matching `policy`.
    pub fn new(
        policy: EvictionPolicy,
        capacity: NonZeroUsize,
        on_item_removed: Option<OnItemRemoved<V>>,
    ) -> Self {
        match policy {
            EvictionPolicy::Lru => EvictionStore::Lru(LruCache::new(capacity, on_item_removed)),
            EvictionPolicy::Random => {
                EvictionStore::Random(RandomEvictCache::new(capacity, on_item_removed))
            }
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        match self {
            EvictionStore::Lru(_) => EvictionPolicy::Lru,
            EvictionStore::Random(_) => EvictionPolicy::Random,
        }
    }
}

impl<K, V> EvictionCache<K, V> for EvictionStore<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn try_get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self {
            EvictionStore::Lru(cache) => cache.try_get(key),
            EvictionStore::Random(cache) => cache.try_get(key),
        }
    }

    fn set(&self, key: K, value: V) -> Option<V> {
        match self {
            EvictionStore::Lru(cache) => cache.set(key, value),
            EvictionStore::Random(cache) => cache.set(key, value),
        }
    }

    fn try_insert(&self, key: K, value: V) -> bool {
        match self {
            EvictionStore::Lru(cache) => cache.try_insert(key, value),
            EvictionStore::Random(cache) => cache.try_insert(key, value),
        }
    }

    fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self {
            EvictionStore::Lru(cache) => cache.remove(key),
            EvictionStore::Random(cache) => cache.remove(key),
        }
    }

    fn remove_if<Q, F>(&self, key: &Q, predicate: F) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        F: FnOnce(&V) -> bool,
    {
        match self {
            EvictionStore::Lru(cache) => cache.remove_if(key, predicate),
            EvictionStore::Random(cache) => cache.remove_if(key, predicate),
        }
    }

    fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self {
            EvictionStore::Lru(cache) => cache.contains_key(key),
            EvictionStore::Random(cache) => cache.contains_key(key),
        }
    }

    fn clear(&self) {
        match self {
            EvictionStore::Lru(cache) => cache.clear(),
            EvictionStore::Random(cache) => cache.clear(),
        }
    }

    fn len(&self) -> usize {
        match self {
            EvictionStore::Lru(cache) => cache.len(),
            EvictionStore::Random(cache) => cache.len(),
        }
    }

    fn capacity(&self) -> usize {
        match self {
            EvictionStore::Lru(cache) => cache.capacity(),
            EvictionStore::Random(cache) => cache.capacity(),
        }
    }

    fn stats(&self) -> CacheStats {
        match self {
            EvictionStore::Lru(cache) => cache.stats(),
            EvictionStore::Random(cache) => cache.stats(),
        }
    }
}
