//! The four per-field containers of a [`CachedStore`](super::CachedStore).

use std::num::NonZeroUsize;

use matchcache_core::{FieldKind, LogEntry, MatchId, MatchMetadata, State};

use super::bounded::BoundedCache;
use super::stats::FieldCacheStats;

/// One bounded container per field kind.
///
/// The containers share no storage: the state of a match may be cached
/// while its log is not, and each evicts independently.
#[derive(Debug)]
pub struct FieldCaches {
    pub metadata: BoundedCache<MatchMetadata>,
    pub state: BoundedCache<State>,
    pub initial_state: BoundedCache<State>,
    pub log: BoundedCache<Vec<LogEntry>>,
}

impl FieldCaches {
    /// Create four containers with the same capacity.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            metadata: BoundedCache::new(FieldKind::Metadata.as_str(), capacity),
            state: BoundedCache::new(FieldKind::State.as_str(), capacity),
            initial_state: BoundedCache::new(FieldKind::InitialState.as_str(), capacity),
            log: BoundedCache::new(FieldKind::Log.as_str(), capacity),
        }
    }

    /// Whether `match_id` is cached for the given field.
    pub fn contains(&self, kind: FieldKind, match_id: &MatchId) -> bool {
        match kind {
            FieldKind::Metadata => self.metadata.contains(match_id),
            FieldKind::State => self.state.contains(match_id),
            FieldKind::InitialState => self.initial_state.contains(match_id),
            FieldKind::Log => self.log.contains(match_id),
        }
    }

    /// Drop `match_id` from all four containers.
    pub fn remove(&self, match_id: &MatchId) {
        self.metadata.delete(match_id);
        self.state.delete(match_id);
        self.initial_state.delete(match_id);
        self.log.delete(match_id);
    }

    /// Clear all four containers.
    pub fn reset(&self) {
        self.metadata.clear();
        self.state.clear();
        self.initial_state.clear();
        self.log.clear();
    }

    pub fn stats(&self) -> FieldCacheStats {
        FieldCacheStats {
            metadata: self.metadata.stats(),
            state: self.state.stats(),
            initial_state: self.initial_state.stats(),
            log: self.log.stats(),
        }
    }
}
