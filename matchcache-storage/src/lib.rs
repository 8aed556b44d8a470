//! matchcache Storage - Storage Trait, In-Memory Backend and Cache Layer
//!
//! Defines the async storage abstraction for match records and the
//! [`CachedStore`] decorator that caches them in front of any backend.

pub mod cache;
pub mod memory;
pub mod traits;

pub use memory::InMemoryStorage;
pub use traits::{LegacyMatchStorage, MatchStorage, StorageApi};

// Re-export cache types for callers wiring up a store
pub use cache::{
    BoundedCache, CacheStats, CacheUpdate, CachedStore, FieldCacheStats, FieldCaches,
};
