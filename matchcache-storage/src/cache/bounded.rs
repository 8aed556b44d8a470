//! Bounded least-recently-used container keyed by match ID.
//!
//! The container knows nothing about match semantics and performs no I/O.
//! All operations take a short synchronous lock; none is ever held across
//! an `.await`.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use matchcache_core::MatchId;
use parking_lot::Mutex;

use super::stats::CacheStats;

/// Outcome of a conditional write.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheUpdate<V> {
    /// The offered value was stored.
    Stored(V),
    /// The existing entry won and was kept.
    Retained(V),
}

impl<V> CacheUpdate<V> {
    /// The value cached after the update.
    pub fn into_value(self) -> V {
        match self {
            CacheUpdate::Stored(value) | CacheUpdate::Retained(value) => value,
        }
    }
}

/// Bounded LRU map from match ID to one field value.
pub struct BoundedCache<V> {
    name: &'static str,
    entries: Mutex<LruCache<MatchId, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Clone> BoundedCache<V> {
    /// Create a container holding at most `capacity` entries.
    pub fn new(name: &'static str, capacity: NonZeroUsize) -> Self {
        Self {
            name,
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Look up an entry and mark it most recently used.
    pub fn get(&self, match_id: &MatchId) -> Option<V> {
        let value = self.entries.lock().get(match_id).cloned();
        let counter = if value.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Look up an entry without touching recency or hit counters.
    pub fn peek(&self, match_id: &MatchId) -> Option<V> {
        self.entries.lock().peek(match_id).cloned()
    }

    pub fn contains(&self, match_id: &MatchId) -> bool {
        self.entries.lock().contains(match_id)
    }

    /// Insert or overwrite an entry, evicting the least recently used one
    /// when the container is full.
    pub fn set(&self, match_id: MatchId, value: V) {
        let mut entries = self.entries.lock();
        self.push(&mut entries, match_id, value);
    }

    /// Store `value` unless `keep_current(current, &value)` says the entry
    /// already cached should win. Check and write happen under one lock.
    pub fn set_unless<F>(&self, match_id: &MatchId, value: V, keep_current: F) -> CacheUpdate<V>
    where
        F: FnOnce(&V, &V) -> bool,
    {
        let mut entries = self.entries.lock();
        if let Some(current) = entries.get(match_id) {
            if keep_current(current, &value) {
                return CacheUpdate::Retained(current.clone());
            }
        }
        self.push(&mut entries, match_id.clone(), value.clone());
        CacheUpdate::Stored(value)
    }

    /// Apply `update` to the cached entry, inserting `default()` first if
    /// there is none. Returns the value cached afterwards.
    pub fn upsert<D, F>(&self, match_id: &MatchId, default: D, update: F) -> V
    where
        D: FnOnce() -> V,
        F: FnOnce(&mut V),
    {
        let mut entries = self.entries.lock();
        if let Some(current) = entries.get_mut(match_id) {
            update(current);
            return current.clone();
        }
        let mut value = default();
        update(&mut value);
        self.push(&mut entries, match_id.clone(), value.clone());
        value
    }

    /// Remove an entry, returning it if present.
    pub fn delete(&self, match_id: &MatchId) -> Option<V> {
        self.entries.lock().pop(match_id)
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Cached IDs, most recently used first.
    pub fn keys(&self) -> Vec<MatchId> {
        self.entries.lock().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.len() as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn push(&self, entries: &mut LruCache<MatchId, V>, match_id: MatchId, value: V) {
        // `push` hands back the old value on overwrite too; only a different
        // key means something was evicted.
        if let Some((evicted, _)) = entries.push(match_id.clone(), value) {
            if evicted != match_id {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(cache = self.name, match_id = %evicted, "Evicted cache entry");
            }
        }
    }
}

impl<V> std::fmt::Debug for BoundedCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("BoundedCache")
            .field("name", &self.name)
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}
