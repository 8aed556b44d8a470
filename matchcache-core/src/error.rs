//! Error types for matchcache operations

use thiserror::Error;

/// Storage layer errors.
///
/// The cache never produces these itself; they come from the backend and
/// pass through unchanged. A missing match is not an error: `fetch`
/// reports it as absent fields.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Backend {operation} failed: {reason}")]
    Backend { operation: String, reason: String },

    #[error("Operation not supported by backend: {operation}")]
    Unsupported { operation: String },
}

impl StorageError {
    pub fn backend(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Backend {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all matchcache errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchCacheError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for matchcache operations.
pub type MatchCacheResult<T> = Result<T, MatchCacheError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_backend() {
        let err = StorageError::backend("set_state", "connection reset");
        assert_eq!(
            err.to_string(),
            "Backend set_state failed: connection reset"
        );
    }

    #[test]
    fn test_master_error_wraps_storage() {
        let err: MatchCacheError = StorageError::unsupported("list_games").into();
        assert!(matches!(
            err,
            MatchCacheError::Storage(StorageError::Unsupported { .. })
        ));
        assert!(err.to_string().starts_with("Storage error:"));
    }

    #[test]
    fn test_master_error_wraps_config() {
        let err: MatchCacheError = ConfigError::InvalidValue {
            field: "cache_capacity".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        }
        .into();
        assert!(err.to_string().contains("cache_capacity"));
    }
}
