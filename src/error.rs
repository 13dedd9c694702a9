//! Error types for the provider cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Provider Cache Error Enum ==
/// Unified error type for the provider cache.
///
/// Only cache construction can fail. Lookups, inserts and removals report
/// absence through `Option` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderCacheError {
    /// Configuration was missing or failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// == Result Type Alias ==
/// Convenience Result type for the provider cache.
pub type Result<T> = std::result::Result<T, ProviderCacheError>;
