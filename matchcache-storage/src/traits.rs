//! Async storage traits for match records.
//!
//! [`MatchStorage`] is the contract every backend implements and the one the
//! cache layer both consumes and exposes. [`LegacyMatchStorage`] carries the
//! deprecated `create_game`/`list_games` names some older backends still use.

use async_trait::async_trait;
use matchcache_core::{
    CreateMatchOpts, FetchFields, FetchResult, ListMatchesOpts, LogEntry, MatchCacheResult,
    MatchId, MatchMetadata, State,
};

/// Async storage trait for match records.
///
/// All operations are fallible; timeouts and cancellation are the backend's
/// concern and surface as errors.
#[async_trait]
pub trait MatchStorage: Send + Sync {
    /// Lifecycle hook run before first use.
    async fn connect(&self) -> MatchCacheResult<()> {
        Ok(())
    }

    /// Store metadata, state and initial state for a new match. The log
    /// starts out empty.
    async fn create_match(&self, match_id: &MatchId, opts: CreateMatchOpts)
        -> MatchCacheResult<()>;

    /// Replace the current state and append `deltalog` to the match log.
    async fn set_state(
        &self,
        match_id: &MatchId,
        state: &State,
        deltalog: Option<&[LogEntry]>,
    ) -> MatchCacheResult<()>;

    /// Replace the match metadata.
    async fn set_metadata(&self, match_id: &MatchId, metadata: &MatchMetadata)
        -> MatchCacheResult<()>;

    /// Read the requested fields in one round trip.
    ///
    /// Missing matches and missing fields come back as `None`, not as errors.
    async fn fetch(&self, match_id: &MatchId, fields: FetchFields) -> MatchCacheResult<FetchResult>;

    /// Remove every field of a match. Wiping an unknown match is not an error.
    async fn wipe(&self, match_id: &MatchId) -> MatchCacheResult<()>;

    /// List IDs of matches whose metadata passes `opts`.
    async fn list_matches(&self, opts: &ListMatchesOpts) -> MatchCacheResult<Vec<MatchId>>;

    /// The deprecated API surface, if this backend still serves it.
    fn legacy_api(&self) -> Option<&dyn LegacyMatchStorage> {
        None
    }
}

/// Deprecated operation names kept for older backends.
#[async_trait]
pub trait LegacyMatchStorage: Send + Sync {
    /// Deprecated name of [`MatchStorage::create_match`].
    async fn create_game(&self, game_id: &MatchId, opts: CreateMatchOpts) -> MatchCacheResult<()>;

    /// Deprecated name of [`MatchStorage::list_matches`].
    async fn list_games(&self, opts: &ListMatchesOpts) -> MatchCacheResult<Vec<MatchId>>;
}

/// Which API surface a backend is driven through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageApi {
    /// `create_match` / `list_matches`.
    Current,
    /// `create_game` / `list_games`.
    Legacy,
}

impl StorageApi {
    /// Inspect a backend once. Backends exposing the legacy surface are
    /// driven through it.
    pub fn detect<S: MatchStorage + ?Sized>(storage: &S) -> Self {
        if storage.legacy_api().is_some() {
            StorageApi::Legacy
        } else {
            StorageApi::Current
        }
    }
}
