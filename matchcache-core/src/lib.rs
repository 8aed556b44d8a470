//! matchcache Core - Match Record Types
//!
//! Pure data structures shared by the storage backends and the cache layer.
//! A match record is split into four independently stored fields: metadata,
//! the current state, the initial state and the append-only action log.

pub mod config;
pub mod entities;
pub mod error;
pub mod fields;

pub use config::{CacheConfig, CACHE_CAPACITY_ENV, DEFAULT_CACHE_CAPACITY};
pub use entities::{
    CreateMatchOpts, ListMatchesOpts, LogAction, LogEntry, MatchFilter, MatchId, MatchMetadata,
    PlayerMetadata, State, Timestamp, Version,
};
pub use error::{ConfigError, MatchCacheError, MatchCacheResult, StorageError};
pub use fields::{FetchFields, FetchResult, FieldKind};
