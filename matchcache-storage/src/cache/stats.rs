//! Cache usage statistics.

use matchcache_core::FieldKind;

/// Statistics about one field container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
    /// Number of evictions due to capacity.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Statistics for all four field containers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCacheStats {
    pub metadata: CacheStats,
    pub state: CacheStats,
    pub initial_state: CacheStats,
    pub log: CacheStats,
}

impl FieldCacheStats {
    pub fn get(&self, kind: FieldKind) -> &CacheStats {
        match kind {
            FieldKind::Metadata => &self.metadata,
            FieldKind::State => &self.state,
            FieldKind::InitialState => &self.initial_state,
            FieldKind::Log => &self.log,
        }
    }

    /// Sum of all four containers.
    pub fn total(&self) -> CacheStats {
        FieldKind::ALL
            .iter()
            .map(|kind| self.get(*kind))
            .fold(CacheStats::default(), |acc, stats| CacheStats {
                hits: acc.hits + stats.hits,
                misses: acc.misses + stats.misses,
                entry_count: acc.entry_count + stats.entry_count,
                evictions: acc.evictions + stats.evictions,
            })
    }
}
