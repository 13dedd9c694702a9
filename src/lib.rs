//! Provider Cache - capacity-bounded caches for signature providers
//!
//! Signing and verifying providers are cached by key under an LRU or random
//! eviction policy. Evicted providers have their back-reference to the cache
//! cleared.

pub mod cache;
pub mod config;
pub mod error;
pub mod facade;
pub mod factory;
pub mod provider;
pub mod tasks;

pub use config::{CacheConfig, Config, EvictionPolicy};
pub use error::{ProviderCacheError, Result};
pub use facade::{CryptoProviderCache, OperationKind, ProviderCacheStats};
pub use factory::CacheFactory;
pub use provider::{CachedProvider, OwnerRef, SignatureProvider};
