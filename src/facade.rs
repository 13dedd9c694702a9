//! Crypto Provider Cache Facade
//!
//! Two independent eviction caches, one for signing providers and one for
//! verifying providers, behind a single lookup/insert surface.

use std::fmt;
use std::sync::{Arc, Weak};

use serde::Serialize;
use tracing::debug;

use crate::cache::{CacheStats, EvictionCache, EvictionStore};
use crate::config::CacheConfig;
use crate::provider::CachedProvider;

// == Operation Kind ==
/// Selects which of the two provider caches an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Signing,
    Verifying,
}

impl OperationKind {
    /// Maps a provider's direction to its cache.
    pub fn for_signatures(will_create_signatures: bool) -> Self {
        if will_create_signatures {
            OperationKind::Signing
        } else {
            OperationKind::Verifying
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Signing => f.write_str("signing"),
            OperationKind::Verifying => f.write_str("verifying"),
        }
    }
}

/// Statistics for both provider caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderCacheStats {
    pub signing: CacheStats,
    pub verifying: CacheStats,
}

// == Crypto Provider Cache ==
/// Owns the signing and verifying caches.
///
/// Always handed out as an `Arc`; providers inserted through it hold a
/// `Weak` back-reference to it. Build one with
/// [`CacheFactory`](crate::factory::CacheFactory).
pub struct CryptoProviderCache<P: CachedProvider> {
    config: CacheConfig,
    signing: EvictionStore<String, Arc<P>>,
    verifying: EvictionStore<String, Arc<P>>,
    this: Weak<CryptoProviderCache<P>>,
}

impl<P: CachedProvider> CryptoProviderCache<P> {
    pub(crate) fn new(
        config: CacheConfig,
        signing: EvictionStore<String, Arc<P>>,
        verifying: EvictionStore<String, Arc<P>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            config,
            signing,
            verifying,
            this: this.clone(),
        })
    }

    fn store(&self, kind: OperationKind) -> &EvictionStore<String, Arc<P>> {
        match kind {
            OperationKind::Signing => &self.signing,
            OperationKind::Verifying => &self.verifying,
        }
    }

    // == Get ==
    /// Looks up a provider in the cache for `kind`.
    pub fn get(&self, kind: OperationKind, key: &str) -> Option<Arc<P>> {
        self.store(kind).try_get(key)
    }

    // == Try Set ==
    /// Inserts or replaces a provider in the cache for `kind`.
    ///
    /// The provider's back-reference is pointed at this cache before the
    /// provider becomes visible to other threads. A replaced provider is
    /// returned as-is; its back-reference is left for the caller.
    pub fn try_set(&self, kind: OperationKind, key: impl Into<String>, provider: Arc<P>) -> Option<Arc<P>> {
        let key = key.into();
        provider.owner().set(self.this.clone());
        debug!(%kind, key = %key, "Caching provider");
        self.store(kind).set(key, provider)
    }

    // == Remove ==
    /// Removes a provider by key. The removed provider keeps its back-reference.
    pub fn remove(&self, kind: OperationKind, key: &str) -> Option<Arc<P>> {
        let removed = self.store(kind).remove(key);
        if removed.is_some() {
            debug!(%kind, key, "Removed provider");
        }
        removed
    }

    // == Cache Key ==
    /// Derives the key a provider is cached under.
    pub fn cache_key(provider: &P) -> String {
        Self::key_for(provider.key_id(), provider.algorithm(), provider.provider_type())
    }

    fn key_for(key_id: &str, algorithm: &str, provider_type: &str) -> String {
        format!("{}-{}-{}", key_id, algorithm, provider_type)
    }

    // == Try Add ==
    /// Caches a provider under its derived key.
    ///
    /// The duplicate check and the insert are one step, so of several
    /// concurrent adds for the same key exactly one returns true. A rejected
    /// provider's back-reference is restored to what it was before the call.
    pub fn try_add(&self, provider: Arc<P>) -> bool {
        let kind = OperationKind::for_signatures(provider.will_create_signatures());
        let key = Self::cache_key(&provider);

        let previous = provider.owner().replace(self.this.clone());
        if self.store(kind).try_insert(key.clone(), provider.clone()) {
            debug!(%kind, key = %key, "Added provider");
            return true;
        }

        provider.owner().set(previous);
        debug!(%kind, key = %key, "Provider key already cached");
        false
    }

    // == Try Get Provider ==
    /// Looks up a provider by the parts of its derived key.
    pub fn try_get_provider(
        &self,
        key_id: &str,
        algorithm: &str,
        provider_type: &str,
        will_create_signatures: bool,
    ) -> Option<Arc<P>> {
        let key = Self::key_for(key_id, algorithm, provider_type);
        self.get(OperationKind::for_signatures(will_create_signatures), &key)
    }

    // == Try Remove ==
    /// Removes a provider this cache owns and clears its back-reference.
    ///
    /// Only the exact provider instance is removed. Returns false if the
    /// provider's back-reference points elsewhere, or if its key is empty or
    /// now holds a different provider.
    pub fn try_remove(&self, provider: &P) -> bool {
        if !provider.owner().is(self) {
            return false;
        }

        let kind = OperationKind::for_signatures(provider.will_create_signatures());
        let key = Self::cache_key(provider);
        let removed = self
            .store(kind)
            .remove_if(key.as_str(), |cached| std::ptr::eq(Arc::as_ptr(cached), provider))
            .is_some();
        if removed {
            debug!(%kind, key = %key, "Removed provider");
        }
        // Not cached here any more either way
        provider.owner().clear();
        removed
    }

    // == Clear ==
    /// Empties both caches. Back-references of dropped providers are untouched.
    pub fn clear(&self) {
        self.signing.clear();
        self.verifying.clear();
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn len(&self, kind: OperationKind) -> usize {
        self.store(kind).len()
    }

    pub fn stats(&self) -> ProviderCacheStats {
        ProviderCacheStats {
            signing: self.signing.stats(),
            verifying: self.verifying.stats(),
        }
    }
}

impl<P: CachedProvider> fmt::Debug for CryptoProviderCache<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoProviderCache")
            .field("config", &self.config)
            .field("signing", &self.signing.len())
            .field("verifying", &self.verifying.len())
            .finish()
    }
}
