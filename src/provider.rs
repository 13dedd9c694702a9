//! Provider Module
//!
//! The contract a cached signature provider must satisfy, and a plain
//! provider record that satisfies it.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::facade::CryptoProviderCache;

// == Owner Reference ==
/// Non-owning back-reference from a provider to the cache holding it.
///
/// Empty when the provider is not cached. Holding it never keeps the cache
/// alive.
pub struct OwnerRef<P: CachedProvider> {
    cache: RwLock<Weak<CryptoProviderCache<P>>>,
}

impl<P: CachedProvider> OwnerRef<P> {
    /// Creates an empty back-reference.
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(Weak::new()),
        }
    }

    pub fn set(&self, cache: Weak<CryptoProviderCache<P>>) {
        *self.cache.write() = cache;
    }

    /// Points the back-reference at `cache`, returning the previous target.
    pub fn replace(&self, cache: Weak<CryptoProviderCache<P>>) -> Weak<CryptoProviderCache<P>> {
        std::mem::replace(&mut *self.cache.write(), cache)
    }

    pub fn clear(&self) {
        *self.cache.write() = Weak::new();
    }

    /// Returns the owning cache if one is set and still alive.
    pub fn get(&self) -> Option<Arc<CryptoProviderCache<P>>> {
        self.cache.read().upgrade()
    }

    pub fn is_set(&self) -> bool {
        self.cache.read().strong_count() > 0
    }

    /// Checks whether the back-reference points at `cache`.
    pub fn is(&self, cache: &CryptoProviderCache<P>) -> bool {
        std::ptr::eq(self.cache.read().as_ptr(), cache)
    }
}

impl<P: CachedProvider> Default for OwnerRef<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: CachedProvider> fmt::Debug for OwnerRef<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerRef")
            .field("is_set", &self.is_set())
            .finish()
    }
}

// == Cached Provider ==
/// A value that can be held by a [`CryptoProviderCache`].
///
/// The cache only ever writes the back-reference; the identity accessors are
/// used to derive the cache key and pick the signing or verifying cache.
pub trait CachedProvider: Send + Sync + Sized + 'static {
    /// Identifier of the key material the provider wraps.
    fn key_id(&self) -> &str;

    /// Algorithm the provider implements.
    fn algorithm(&self) -> &str;

    /// Distinguishes provider implementations sharing a key and algorithm.
    fn provider_type(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// True for providers that sign, false for verify-only providers.
    fn will_create_signatures(&self) -> bool;

    /// Back-reference to the owning cache.
    fn owner(&self) -> &OwnerRef<Self>;
}

// == Signature Provider ==
/// Minimal provider record: key id, algorithm and direction.
#[derive(Debug)]
pub struct SignatureProvider {
    key_id: String,
    algorithm: String,
    will_create_signatures: bool,
    owner: OwnerRef<SignatureProvider>,
}

impl SignatureProvider {
    pub fn new(
        key_id: impl Into<String>,
        algorithm: impl Into<String>,
        will_create_signatures: bool,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            algorithm: algorithm.into(),
            will_create_signatures,
            owner: OwnerRef::new(),
        }
    }

    /// Builds a signing provider.
    pub fn signing(key_id: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Self::new(key_id, algorithm, true)
    }

    /// Builds a verify-only provider.
    pub fn verifying(key_id: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Self::new(key_id, algorithm, false)
    }
}

impl CachedProvider for SignatureProvider {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn algorithm(&self) -> &str {
        &self.algorithm
    }

    fn provider_type(&self) -> &str {
        "SignatureProvider"
    }

    fn will_create_signatures(&self) -> bool {
        self.will_create_signatures
    }

    fn owner(&self) -> &OwnerRef<Self> {
        &self.owner
    }
}
