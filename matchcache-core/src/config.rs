//! Configuration types

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, MatchCacheError, MatchCacheResult};

/// Capacity used for each field container when none is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Environment variable overriding [`CacheConfig::cache_capacity`].
pub const CACHE_CAPACITY_ENV: &str = "MATCHCACHE_CACHE_CAPACITY";

/// Cache layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum entries held by each of the four field containers.
    pub cache_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-container capacity.
    pub fn with_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `MATCHCACHE_CACHE_CAPACITY`: entries per field container (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            cache_capacity: std::env::var(CACHE_CAPACITY_ENV)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cache_capacity),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> MatchCacheResult<()> {
        if self.cache_capacity == 0 {
            return Err(MatchCacheError::Config(ConfigError::InvalidValue {
                field: "cache_capacity".to_string(),
                value: self.cache_capacity.to_string(),
                reason: "cache_capacity must be positive".to_string(),
            }));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    // Every case lives in one test: the variable is process-wide.
    #[test]
    fn test_from_env_capacity() {
        {
            let _guard = EnvVarGuard::set(CACHE_CAPACITY_ENV, None);
            assert_eq!(CacheConfig::from_env().cache_capacity, DEFAULT_CACHE_CAPACITY);
        }
        {
            let _guard = EnvVarGuard::set(CACHE_CAPACITY_ENV, Some("250"));
            let config = CacheConfig::from_env();
            assert_eq!(config.cache_capacity, 250);
            assert!(config.validate().is_ok());
        }
        {
            let _guard = EnvVarGuard::set(CACHE_CAPACITY_ENV, Some("lots"));
            assert_eq!(CacheConfig::from_env().cache_capacity, 1000);
        }
        {
            let _guard = EnvVarGuard::set(CACHE_CAPACITY_ENV, Some("0"));
            let config = CacheConfig::from_env();
            assert_eq!(config.cache_capacity, 0);
            assert!(matches!(
                config.validate(),
                Err(MatchCacheError::Config(ConfigError::InvalidValue { .. }))
            ));
        }
    }

    #[test]
    fn test_default_capacity() {
        let config = CacheConfig::default();
        assert_eq!(config.cache_capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = CacheConfig::new().with_capacity(0).validate().unwrap_err();
        assert!(matches!(
            err,
            MatchCacheError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "cache_capacity"
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any positive capacity is accepted as-is.
        #[test]
        fn prop_positive_capacity_validates(capacity in 1usize..100_000) {
            let config = CacheConfig::new().with_capacity(capacity);
            prop_assert!(config.validate().is_ok());
            prop_assert_eq!(config.cache_capacity, capacity);
        }
    }
}
