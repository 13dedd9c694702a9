//! Configuration Module
//!
//! Cache configuration (capacity and eviction policy) plus the settings the
//! workload binary loads from environment variables.

use std::env;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderCacheError, Result};

// == Public Constants ==
/// Default number of entries per underlying eviction cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

// == Eviction Policy ==
/// Algorithm used to choose which entry leaves a full cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict the least recently used entry
    #[default]
    Lru,
    /// Evict a uniformly random entry
    Random,
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Lru => f.write_str("lru"),
            EvictionPolicy::Random => f.write_str("random"),
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = ProviderCacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "random" => Ok(EvictionPolicy::Random),
            other => Err(ProviderCacheError::InvalidConfiguration(format!(
                "unknown eviction policy '{}'",
                other
            ))),
        }
    }
}

// == Cache Config ==
/// Capacity limit and eviction policy shared by both provider caches.
///
/// Read-only once built. Values obtained through `new` are already valid;
/// deserialized values are checked again by the factory via [`validate`].
///
/// [`validate`]: CacheConfig::validate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    capacity: usize,
    policy: EvictionPolicy,
}

impl CacheConfig {
    // == Constructor ==
    /// Creates a validated configuration.
    ///
    /// Fails with `InvalidConfiguration` when `capacity` is 0.
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Result<Self> {
        let config = Self { capacity, policy };
        config.validate()?;
        Ok(config)
    }

    // == Validate ==
    /// Checks the configuration and returns the capacity as a non-zero value.
    pub fn validate(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.capacity).ok_or_else(|| {
            ProviderCacheError::InvalidConfiguration(
                "capacity must be greater than 0".to_string(),
            )
        })
    }

    /// Maximum number of entries per underlying eviction cache.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Eviction policy used by both caches.
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            policy: EvictionPolicy::default(),
        }
    }
}

// == Binary Config ==
/// Settings for the workload binary.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache capacity and policy (not validated until the factory runs)
    pub cache: CacheConfig,
    /// Number of concurrent workload tasks
    pub workers: usize,
    /// Lookups performed by each worker
    pub operations_per_worker: u64,
    /// Number of distinct provider keys the workload draws from
    pub key_space: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PROVIDER_CACHE_CAPACITY` - Entries per cache (default: 1000)
    /// - `PROVIDER_CACHE_POLICY` - `lru` or `random` (default: lru)
    /// - `WORKLOAD_WORKERS` - Concurrent workers (default: 4)
    /// - `WORKLOAD_OPERATIONS` - Lookups per worker (default: 10000)
    /// - `WORKLOAD_KEY_SPACE` - Distinct provider keys (default: 5000)
    ///
    /// Unparseable numbers fall back to their defaults. An unknown policy
    /// name is rejected.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let policy = match env::var("PROVIDER_CACHE_POLICY") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.cache.policy,
        };

        Ok(Self {
            cache: CacheConfig {
                capacity: parse_var("PROVIDER_CACHE_CAPACITY").unwrap_or(defaults.cache.capacity),
                policy,
            },
            workers: parse_var("WORKLOAD_WORKERS").unwrap_or(defaults.workers),
            operations_per_worker: parse_var("WORKLOAD_OPERATIONS")
                .unwrap_or(defaults.operations_per_worker),
            key_space: parse_var("WORKLOAD_KEY_SPACE").unwrap_or(defaults.key_space),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            workers: 4,
            operations_per_worker: 10_000,
            key_space: 5_000,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
