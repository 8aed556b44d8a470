//! Consistency-aware cache layer.
//!
//! A [`CachedStore`] sits in front of any [`MatchStorage`](crate::MatchStorage)
//! backend and keeps one bounded LRU container per match field. Reads that
//! hit all requested fields never reach the backend; misses are batched
//! into a single backend fetch and reconciled against writes that landed
//! while that fetch was in flight.
//!
//! # Example
//!
//! ```ignore
//! let store = CachedStore::new(InMemoryStorage::new());
//! store.set_state(&id, &State::with_version(1), Some(&[entry])).await?;
//!
//! // Cache hit, the backend is not consulted.
//! let read = store.fetch(&id, FetchFields::STATE | FetchFields::LOG).await?;
//! ```

pub mod bounded;
pub mod fields;
pub mod stats;
pub mod store;

pub use bounded::{BoundedCache, CacheUpdate};
pub use fields::FieldCaches;
pub use stats::{CacheStats, FieldCacheStats};
pub use store::CachedStore;
