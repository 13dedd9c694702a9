//! Cache Factory
//!
//! Validates a [`CacheConfig`] and wires the chosen eviction policy into a
//! [`CryptoProviderCache`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{EvictionStore, OnItemRemoved};
use crate::config::CacheConfig;
use crate::error::{ProviderCacheError, Result};
use crate::facade::CryptoProviderCache;
use crate::provider::CachedProvider;

/// Builds provider caches.
pub struct CacheFactory;

impl CacheFactory {
    // == Create ==
    /// Builds a facade whose signing and verifying caches share `config`.
    ///
    /// Evicted providers get their back-reference cleared before the `set`
    /// that evicted them returns. Nothing is built if `config` is invalid.
    pub fn create<P: CachedProvider>(config: &CacheConfig) -> Result<Arc<CryptoProviderCache<P>>> {
        let capacity = config.validate().inspect_err(|err| {
            warn!(error = %err, "Rejected provider cache configuration");
        })?;

        let signing = EvictionStore::new(config.policy(), capacity, Some(clear_owner::<P>()));
        let verifying = EvictionStore::new(config.policy(), capacity, Some(clear_owner::<P>()));

        info!(
            policy = %config.policy(),
            capacity = capacity.get(),
            "Created crypto provider cache"
        );

        Ok(CryptoProviderCache::new(*config, signing, verifying))
    }

    /// Like [`create`](Self::create), but treats a missing configuration as invalid.
    pub fn create_from_options<P: CachedProvider>(
        config: Option<&CacheConfig>,
    ) -> Result<Arc<CryptoProviderCache<P>>> {
        match config {
            Some(config) => Self::create(config),
            None => {
                warn!("Rejected missing provider cache configuration");
                Err(ProviderCacheError::InvalidConfiguration(
                    "configuration is required".to_string(),
                ))
            }
        }
    }

    /// Builds a facade from the default configuration.
    pub fn create_default<P: CachedProvider>() -> Result<Arc<CryptoProviderCache<P>>> {
        Self::create(&CacheConfig::default())
    }
}

fn clear_owner<P: CachedProvider>() -> OnItemRemoved<Arc<P>> {
    Arc::new(|provider: &Arc<P>| provider.owner().clear())
}
