//! Workload Task
//!
//! Drives get-or-create traffic through a provider cache: look a provider up,
//! and on a miss build one and add it.

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::Config;
use crate::facade::CryptoProviderCache;
use crate::provider::{CachedProvider, SignatureProvider};

/// Algorithms the workload spreads its keys across.
const ALGORITHMS: [&str; 3] = ["RS256", "ES256", "PS256"];

/// Lookups between cooperative yields.
const YIELD_EVERY: u64 = 64;

/// Shape of the traffic one worker generates.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadSettings {
    pub operations: u64,
    pub key_space: usize,
}

impl From<&Config> for WorkloadSettings {
    fn from(config: &Config) -> Self {
        Self {
            operations: config.operations_per_worker,
            key_space: config.key_space.max(1),
        }
    }
}

/// What one worker did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub lookups: u64,
    pub hits: u64,
    /// Providers built after a miss and added to the cache
    pub added: u64,
}

/// Spawns a worker issuing `settings.operations` lookups against `cache`.
///
/// Abort the returned handle to stop early.
pub fn spawn_workload(
    cache: Arc<CryptoProviderCache<SignatureProvider>>,
    worker: usize,
    settings: WorkloadSettings,
) -> JoinHandle<WorkerReport> {
    tokio::spawn(async move {
        let mut rng = SmallRng::from_os_rng();
        let mut report = WorkerReport::default();
        let key_space = settings.key_space.max(1);

        debug!(worker, operations = settings.operations, "Workload worker started");

        for op in 0..settings.operations {
            let index = rng.random_range(0..key_space);
            let key_id = format!("key-{}", index);
            let algorithm = ALGORITHMS[index % ALGORITHMS.len()];
            let signing = rng.random_bool(0.5);

            report.lookups += 1;
            let provider = SignatureProvider::new(key_id.as_str(), algorithm, signing);
            match cache.try_get_provider(&key_id, algorithm, provider.provider_type(), signing) {
                Some(_) => report.hits += 1,
                None => {
                    if cache.try_add(Arc::new(provider)) {
                        report.added += 1;
                    }
                }
            }

            if (op + 1) % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        }

        info!(
            worker,
            lookups = report.lookups,
            hits = report.hits,
            added = report.added,
            "Workload worker finished"
        );
        report
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, EvictionPolicy};
    use crate::facade::OperationKind;
    use crate::factory::CacheFactory;

    fn cache(capacity: usize, policy: EvictionPolicy) -> Arc<CryptoProviderCache<SignatureProvider>> {
        CacheFactory::create(&CacheConfig::new(capacity, policy).unwrap()).unwrap()
    }

    #[test]
    fn test_settings_from_config() {
        let config = Config {
            key_space: 0,
            ..Config::default()
        };
        let settings = WorkloadSettings::from(&config);
        assert_eq!(settings.operations, 10_000);
        assert_eq!(settings.key_space, 1);
    }

    #[tokio::test]
    async fn test_workload_small_key_space_hits_after_warmup() {
        let cache = cache(16, EvictionPolicy::Lru);
        let settings = WorkloadSettings {
            operations: 500,
            key_space: 4,
        };

        let report = spawn_workload(cache.clone(), 0, settings).await.unwrap();

        assert_eq!(report.lookups, 500);
        assert_eq!(report.hits + report.added, 500);
        // At most 4 keys per direction ever need adding
        assert!(report.added <= 8);
        assert!(cache.len(OperationKind::Signing) <= 4);
        assert!(cache.len(OperationKind::Verifying) <= 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_workers_respect_capacity() {
        for policy in [EvictionPolicy::Lru, EvictionPolicy::Random] {
            let cache = cache(8, policy);
            let settings = WorkloadSettings {
                operations: 2_000,
                key_space: 64,
            };

            let handles: Vec<_> = (0..4)
                .map(|worker| spawn_workload(cache.clone(), worker, settings))
                .collect();

            let mut lookups = 0;
            for handle in handles {
                lookups += handle.await.unwrap().lookups;
            }

            assert_eq!(lookups, 8_000);
            let stats = cache.stats();
            assert!(stats.signing.total_entries <= 8);
            assert!(stats.verifying.total_entries <= 8);
            assert!(stats.signing.evictions + stats.verifying.evictions > 0);
        }
    }

    #[tokio::test]
    async fn test_workload_can_be_aborted() {
        let cache = cache(8, EvictionPolicy::Random);
        let settings = WorkloadSettings {
            operations: u64::MAX,
            key_space: 32,
        };

        let handle = spawn_workload(cache, 0, settings);
        handle.abort();

        let result = handle.await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
