//! Consistency-aware caching decorator.
//!
//! [`CachedStore`] wraps any [`MatchStorage`] and serves repeated reads from
//! four bounded per-field containers. Operations for the same match may be
//! in flight concurrently; no lock is held around backend calls. Ordering
//! comes from the state version instead:
//!
//! - a fetched state only replaces a cached one if its version is at least
//!   as high, so a write that finished while the read was in flight wins;
//! - a written state only replaces a cached one if its version is strictly
//!   higher, so retried or reordered writes never regress the cache.
//!
//! Writes update the cache before the backend call returns. A backend
//! failure on `set_state` therefore leaves the cache ahead of the backend;
//! callers needing strict consistency should wipe or reset on error.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use matchcache_core::{
    CacheConfig, ConfigError, CreateMatchOpts, FetchFields, FetchResult, FieldKind,
    ListMatchesOpts, LogEntry, MatchCacheError, MatchCacheResult, MatchId, MatchMetadata, State,
    DEFAULT_CACHE_CAPACITY,
};

use super::bounded::CacheUpdate;
use super::fields::FieldCaches;
use super::stats::FieldCacheStats;
use crate::traits::{MatchStorage, StorageApi};

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(DEFAULT_CACHE_CAPACITY) {
    Some(capacity) => capacity,
    None => panic!("default cache capacity must be positive"),
};

/// Caching wrapper around a match storage backend.
///
/// # Example
///
/// ```ignore
/// let store = CachedStore::with_config(backend, CacheConfig::from_env())?;
/// store.connect().await?;
///
/// store.create_match(&id, opts).await?;
/// // Served from cache, no backend round trip.
/// let read = store.fetch(&id, FetchFields::STATE | FetchFields::LOG).await?;
/// ```
pub struct CachedStore<S: MatchStorage> {
    /// The wrapped backend.
    db: S,
    /// API surface chosen for `db` at construction.
    api: StorageApi,
    caches: FieldCaches,
    config: CacheConfig,
}

impl<S: MatchStorage> CachedStore<S> {
    /// Wrap `db` with the default capacity of 1000 entries per field.
    pub fn new(db: S) -> Self {
        Self::build(db, CacheConfig::default(), DEFAULT_CAPACITY)
    }

    /// Wrap `db` with an explicit configuration.
    pub fn with_config(db: S, config: CacheConfig) -> MatchCacheResult<Self> {
        config.validate()?;
        let capacity = NonZeroUsize::new(config.cache_capacity).ok_or_else(|| {
            MatchCacheError::Config(ConfigError::InvalidValue {
                field: "cache_capacity".to_string(),
                value: config.cache_capacity.to_string(),
                reason: "cache_capacity must be positive".to_string(),
            })
        })?;
        Ok(Self::build(db, config, capacity))
    }

    fn build(db: S, config: CacheConfig, capacity: NonZeroUsize) -> Self {
        let api = StorageApi::detect(&db);
        if api == StorageApi::Legacy {
            tracing::debug!("Backend exposes deprecated API, routing create/list through it");
        }
        Self {
            db,
            api,
            caches: FieldCaches::new(capacity),
            config,
        }
    }

    /// Get a reference to the wrapped backend.
    pub fn backend(&self) -> &S {
        &self.db
    }

    /// Get the per-field containers.
    pub fn cache(&self) -> &FieldCaches {
        &self.caches
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// API surface the backend is driven through.
    pub fn storage_api(&self) -> StorageApi {
        self.api
    }

    /// Drop every cached entry. The backend is not touched.
    pub fn reset_cache(&self) {
        self.caches.reset();
        tracing::debug!("Cache reset");
    }

    pub fn stats(&self) -> FieldCacheStats {
        self.caches.stats()
    }

    /// Decide between a state read from the backend and whatever a
    /// concurrent writer cached while that read was in flight.
    fn reconcile_state(&self, match_id: &MatchId, fetched: State) -> State {
        let backend_version = fetched.version();
        let update = self
            .caches
            .state
            .set_unless(match_id, fetched, |cached, fetched| {
                cached.is_newer_than(fetched)
            });
        if let CacheUpdate::Retained(cached) = &update {
            tracing::debug!(
                match_id = %match_id,
                cached_version = cached.version(),
                backend_version,
                "Cached state is newer than backend read, keeping cache"
            );
        }
        update.into_value()
    }

    /// Same as [`reconcile_state`](Self::reconcile_state) for the log, which
    /// only ever grows: a longer cached log was extended by a concurrent write.
    fn reconcile_log(&self, match_id: &MatchId, fetched: Vec<LogEntry>) -> Vec<LogEntry> {
        let backend_len = fetched.len();
        let update = self
            .caches
            .log
            .set_unless(match_id, fetched, |cached, fetched| cached.len() > fetched.len());
        if let CacheUpdate::Retained(cached) = &update {
            tracing::debug!(
                match_id = %match_id,
                cached_len = cached.len(),
                backend_len,
                "Cached log is longer than backend read, keeping cache"
            );
        }
        update.into_value()
    }

    /// Append `delta` to the cached log, loading the log from the backend
    /// first if it is not cached.
    async fn append_log(&self, match_id: &MatchId, delta: &[LogEntry]) -> MatchCacheResult<()> {
        let loaded = if self.caches.log.contains(match_id) {
            None
        } else {
            tracing::debug!(match_id = %match_id, "Log not cached, loading from backend");
            self.db.fetch(match_id, FetchFields::LOG).await?.log
        };
        let log = self.caches.log.upsert(
            match_id,
            move || loaded.unwrap_or_default(),
            |log| log.extend_from_slice(delta),
        );
        tracing::trace!(match_id = %match_id, log_len = log.len(), "Log cache extended");
        Ok(())
    }
}

#[async_trait]
impl<S: MatchStorage> MatchStorage for CachedStore<S> {
    async fn connect(&self) -> MatchCacheResult<()> {
        self.db.connect().await
    }

    async fn create_match(
        &self,
        match_id: &MatchId,
        opts: CreateMatchOpts,
    ) -> MatchCacheResult<()> {
        self.caches
            .metadata
            .set(match_id.clone(), opts.metadata.clone());
        self.caches
            .state
            .set(match_id.clone(), opts.initial_state.clone());
        self.caches
            .initial_state
            .set(match_id.clone(), opts.initial_state.clone());
        self.caches.log.set(match_id.clone(), Vec::new());

        match (self.api, self.db.legacy_api()) {
            (StorageApi::Legacy, Some(legacy)) => legacy.create_game(match_id, opts).await,
            _ => self.db.create_match(match_id, opts).await,
        }
    }

    async fn set_state(
        &self,
        match_id: &MatchId,
        state: &State,
        deltalog: Option<&[LogEntry]>,
    ) -> MatchCacheResult<()> {
        if let Some(delta) = deltalog.filter(|delta| !delta.is_empty()) {
            self.append_log(match_id, delta).await?;
        }

        let update = self
            .caches
            .state
            .set_unless(match_id, state.clone(), |cached, new| {
                !new.is_newer_than(cached)
            });
        if let CacheUpdate::Retained(cached) = &update {
            tracing::debug!(
                match_id = %match_id,
                cached_version = cached.version(),
                write_version = state.version(),
                "Ignoring stale state for cache, forwarding to backend"
            );
        }

        if let Err(err) = self.db.set_state(match_id, state, deltalog).await {
            tracing::warn!(
                match_id = %match_id,
                error = %err,
                "Backend rejected state write, cache is ahead of backend"
            );
            return Err(err);
        }
        Ok(())
    }

    async fn set_metadata(
        &self,
        match_id: &MatchId,
        metadata: &MatchMetadata,
    ) -> MatchCacheResult<()> {
        self.caches
            .metadata
            .set(match_id.clone(), metadata.clone());
        self.db.set_metadata(match_id, metadata).await
    }

    async fn fetch(&self, match_id: &MatchId, fields: FetchFields) -> MatchCacheResult<FetchResult> {
        let mut result = FetchResult::default();
        let mut from_db = FetchFields::empty();

        for kind in fields.kinds() {
            let hit = match kind {
                FieldKind::Metadata => {
                    result.metadata = self.caches.metadata.get(match_id);
                    result.metadata.is_some()
                }
                FieldKind::State => {
                    result.state = self.caches.state.get(match_id);
                    result.state.is_some()
                }
                FieldKind::InitialState => {
                    result.initial_state = self.caches.initial_state.get(match_id);
                    result.initial_state.is_some()
                }
                FieldKind::Log => {
                    result.log = self.caches.log.get(match_id);
                    result.log.is_some()
                }
            };
            if !hit {
                from_db |= kind.flag();
            }
        }

        if from_db.is_empty() {
            tracing::trace!(match_id = %match_id, "Cache hit");
            return Ok(result);
        }

        tracing::trace!(match_id = %match_id, missing = ?from_db, "Cache miss, fetching from backend");
        let response = self.db.fetch(match_id, from_db).await?.retain(from_db);

        // Fields without a version are taken as-is.
        if let Some(metadata) = response.metadata {
            self.caches
                .metadata
                .set(match_id.clone(), metadata.clone());
            result.metadata = Some(metadata);
        }
        if let Some(initial_state) = response.initial_state {
            self.caches
                .initial_state
                .set(match_id.clone(), initial_state.clone());
            result.initial_state = Some(initial_state);
        }
        if let Some(log) = response.log {
            result.log = Some(self.reconcile_log(match_id, log));
        }
        if let Some(state) = response.state {
            result.state = Some(self.reconcile_state(match_id, state));
        }

        Ok(result)
    }

    async fn wipe(&self, match_id: &MatchId) -> MatchCacheResult<()> {
        self.db.wipe(match_id).await?;
        self.caches.remove(match_id);
        Ok(())
    }

    async fn list_matches(&self, opts: &ListMatchesOpts) -> MatchCacheResult<Vec<MatchId>> {
        match (self.api, self.db.legacy_api()) {
            (StorageApi::Legacy, Some(legacy)) => legacy.list_games(opts).await,
            _ => self.db.list_matches(opts).await,
        }
    }
}
