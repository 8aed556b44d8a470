//! matchcache Test Utilities
//!
//! Centralized test infrastructure for the matchcache workspace:
//! - Proptest generators for match record types
//! - Backend wrappers that add lag, failures, call counting or the
//!   deprecated API surface
//! - Test fixtures for common scenarios
//! - Tracing setup for tests

// Re-export storage types from their source crate
pub use matchcache_storage::{
    CachedStore, InMemoryStorage, LegacyMatchStorage, MatchStorage, StorageApi,
};

// Re-export core types for convenience
pub use matchcache_core::{
    CacheConfig, CreateMatchOpts, FetchFields, FetchResult, FieldKind, ListMatchesOpts, LogEntry,
    MatchCacheError, MatchCacheResult, MatchId, MatchMetadata, State, StorageError,
};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

// ============================================================================
// TRACING
// ============================================================================

/// Install a test-friendly subscriber once. Honours `RUST_LOG`, defaults
/// to `warn`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// ============================================================================
// BACKEND WRAPPERS
// ============================================================================
//
// Each wrapper applies its behaviour to the deprecated surface too, so a
// wrapped legacy backend is lagged, counted or failed the same way.

/// The inner backend's deprecated surface, for wrappers re-exposing it.
fn inner_legacy<'a, S: MatchStorage>(
    inner: &'a S,
    operation: &str,
) -> MatchCacheResult<&'a dyn LegacyMatchStorage> {
    inner
        .legacy_api()
        .ok_or_else(|| StorageError::unsupported(operation).into())
}

/// Backend that sleeps before and after every fetch.
///
/// A fetch observes the inner backend `lag` after it was issued and
/// returns `2 * lag` after it was issued, which leaves a window for
/// concurrent writes to land in the cache.
#[derive(Debug)]
pub struct LaggyStorage<S> {
    inner: S,
    lag: Duration,
}

impl<S: MatchStorage> LaggyStorage<S> {
    pub fn new(inner: S, lag: Duration) -> Self {
        Self { inner, lag }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: MatchStorage> MatchStorage for LaggyStorage<S> {
    async fn connect(&self) -> MatchCacheResult<()> {
        self.inner.connect().await
    }

    async fn create_match(&self, match_id: &MatchId, opts: CreateMatchOpts) -> MatchCacheResult<()> {
        self.inner.create_match(match_id, opts).await
    }

    async fn set_state(
        &self,
        match_id: &MatchId,
        state: &State,
        deltalog: Option<&[LogEntry]>,
    ) -> MatchCacheResult<()> {
        self.inner.set_state(match_id, state, deltalog).await
    }

    async fn set_metadata(&self, match_id: &MatchId, metadata: &MatchMetadata) -> MatchCacheResult<()> {
        self.inner.set_metadata(match_id, metadata).await
    }

    async fn fetch(&self, match_id: &MatchId, fields: FetchFields) -> MatchCacheResult<FetchResult> {
        tokio::time::sleep(self.lag).await;
        let result = self.inner.fetch(match_id, fields).await;
        tokio::time::sleep(self.lag).await;
        result
    }

    async fn wipe(&self, match_id: &MatchId) -> MatchCacheResult<()> {
        self.inner.wipe(match_id).await
    }

    async fn list_matches(&self, opts: &ListMatchesOpts) -> MatchCacheResult<Vec<MatchId>> {
        self.inner.list_matches(opts).await
    }

    fn legacy_api(&self) -> Option<&dyn LegacyMatchStorage> {
        self.inner.legacy_api().map(|_| self as &dyn LegacyMatchStorage)
    }
}

#[async_trait]
impl<S: MatchStorage> LegacyMatchStorage for LaggyStorage<S> {
    async fn create_game(&self, game_id: &MatchId, opts: CreateMatchOpts) -> MatchCacheResult<()> {
        inner_legacy(&self.inner, "create_game")?
            .create_game(game_id, opts)
            .await
    }

    async fn list_games(&self, opts: &ListMatchesOpts) -> MatchCacheResult<Vec<MatchId>> {
        inner_legacy(&self.inner, "list_games")?.list_games(opts).await
    }
}

/// Backend that counts calls per operation.
#[derive(Debug, Default)]
pub struct CountingStorage<S> {
    inner: S,
    connects: AtomicUsize,
    fetches: AtomicUsize,
    state_writes: AtomicUsize,
    lists: AtomicUsize,
}

impl<S: MatchStorage> CountingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            connects: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            state_writes: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of `fetch` calls that reached this backend.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn state_write_count(&self) -> usize {
        self.state_writes.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: MatchStorage> MatchStorage for CountingStorage<S> {
    async fn connect(&self) -> MatchCacheResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.connect().await
    }

    async fn create_match(&self, match_id: &MatchId, opts: CreateMatchOpts) -> MatchCacheResult<()> {
        self.inner.create_match(match_id, opts).await
    }

    async fn set_state(
        &self,
        match_id: &MatchId,
        state: &State,
        deltalog: Option<&[LogEntry]>,
    ) -> MatchCacheResult<()> {
        self.state_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_state(match_id, state, deltalog).await
    }

    async fn set_metadata(&self, match_id: &MatchId, metadata: &MatchMetadata) -> MatchCacheResult<()> {
        self.inner.set_metadata(match_id, metadata).await
    }

    async fn fetch(&self, match_id: &MatchId, fields: FetchFields) -> MatchCacheResult<FetchResult> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(match_id, fields).await
    }

    async fn wipe(&self, match_id: &MatchId) -> MatchCacheResult<()> {
        self.inner.wipe(match_id).await
    }

    async fn list_matches(&self, opts: &ListMatchesOpts) -> MatchCacheResult<Vec<MatchId>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list_matches(opts).await
    }

    fn legacy_api(&self) -> Option<&dyn LegacyMatchStorage> {
        self.inner.legacy_api().map(|_| self as &dyn LegacyMatchStorage)
    }
}

#[async_trait]
impl<S: MatchStorage> LegacyMatchStorage for CountingStorage<S> {
    async fn create_game(&self, game_id: &MatchId, opts: CreateMatchOpts) -> MatchCacheResult<()> {
        inner_legacy(&self.inner, "create_game")?
            .create_game(game_id, opts)
            .await
    }

    async fn list_games(&self, opts: &ListMatchesOpts) -> MatchCacheResult<Vec<MatchId>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        inner_legacy(&self.inner, "list_games")?.list_games(opts).await
    }
}

/// Backend whose state writes can be switched to fail.
#[derive(Debug, Default)]
pub struct FlakyStorage<S> {
    inner: S,
    failing: AtomicBool,
}

impl<S: MatchStorage> FlakyStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Make subsequent `set_state` calls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: MatchStorage> MatchStorage for FlakyStorage<S> {
    async fn connect(&self) -> MatchCacheResult<()> {
        self.inner.connect().await
    }

    async fn create_match(&self, match_id: &MatchId, opts: CreateMatchOpts) -> MatchCacheResult<()> {
        self.inner.create_match(match_id, opts).await
    }

    async fn set_state(
        &self,
        match_id: &MatchId,
        state: &State,
        deltalog: Option<&[LogEntry]>,
    ) -> MatchCacheResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::backend("set_state", "injected failure").into());
        }
        self.inner.set_state(match_id, state, deltalog).await
    }

    async fn set_metadata(&self, match_id: &MatchId, metadata: &MatchMetadata) -> MatchCacheResult<()> {
        self.inner.set_metadata(match_id, metadata).await
    }

    async fn fetch(&self, match_id: &MatchId, fields: FetchFields) -> MatchCacheResult<FetchResult> {
        self.inner.fetch(match_id, fields).await
    }

    async fn wipe(&self, match_id: &MatchId) -> MatchCacheResult<()> {
        self.inner.wipe(match_id).await
    }

    async fn list_matches(&self, opts: &ListMatchesOpts) -> MatchCacheResult<Vec<MatchId>> {
        self.inner.list_matches(opts).await
    }

    fn legacy_api(&self) -> Option<&dyn LegacyMatchStorage> {
        self.inner.legacy_api().map(|_| self as &dyn LegacyMatchStorage)
    }
}

#[async_trait]
impl<S: MatchStorage> LegacyMatchStorage for FlakyStorage<S> {
    async fn create_game(&self, game_id: &MatchId, opts: CreateMatchOpts) -> MatchCacheResult<()> {
        inner_legacy(&self.inner, "create_game")?
            .create_game(game_id, opts)
            .await
    }

    async fn list_games(&self, opts: &ListMatchesOpts) -> MatchCacheResult<Vec<MatchId>> {
        inner_legacy(&self.inner, "list_games")?.list_games(opts).await
    }
}

/// Backend that only serves create and list through the deprecated names.
///
/// `create_match` and `list_matches` fail with `Unsupported`, so a caller
/// that ignores the legacy surface is caught immediately.
#[derive(Debug, Default)]
pub struct DeprecatedStorage {
    inner: InMemoryStorage,
    legacy_calls: AtomicUsize,
}

impl DeprecatedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls made through the deprecated names.
    pub fn legacy_call_count(&self) -> usize {
        self.legacy_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchStorage for DeprecatedStorage {
    async fn create_match(&self, _match_id: &MatchId, _opts: CreateMatchOpts) -> MatchCacheResult<()> {
        Err(StorageError::unsupported("create_match").into())
    }

    async fn set_state(
        &self,
        match_id: &MatchId,
        state: &State,
        deltalog: Option<&[LogEntry]>,
    ) -> MatchCacheResult<()> {
        self.inner.set_state(match_id, state, deltalog).await
    }

    async fn set_metadata(&self, match_id: &MatchId, metadata: &MatchMetadata) -> MatchCacheResult<()> {
        self.inner.set_metadata(match_id, metadata).await
    }

    async fn fetch(&self, match_id: &MatchId, fields: FetchFields) -> MatchCacheResult<FetchResult> {
        self.inner.fetch(match_id, fields).await
    }

    async fn wipe(&self, match_id: &MatchId) -> MatchCacheResult<()> {
        self.inner.wipe(match_id).await
    }

    async fn list_matches(&self, _opts: &ListMatchesOpts) -> MatchCacheResult<Vec<MatchId>> {
        Err(StorageError::unsupported("list_matches").into())
    }

    fn legacy_api(&self) -> Option<&dyn LegacyMatchStorage> {
        Some(self)
    }
}

#[async_trait]
impl LegacyMatchStorage for DeprecatedStorage {
    async fn create_game(&self, game_id: &MatchId, opts: CreateMatchOpts) -> MatchCacheResult<()> {
        self.legacy_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_match(game_id, opts).await
    }

    async fn list_games(&self, opts: &ListMatchesOpts) -> MatchCacheResult<Vec<MatchId>> {
        self.legacy_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_matches(opts).await
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Initial state used by most scenarios.
pub fn sample_state() -> State {
    State {
        state_id: 0,
        g: serde_json::json!("G"),
        ctx: serde_json::json!("ctx"),
        plugins: serde_json::Value::Null,
    }
}

/// Metadata for a two-player match of `game_name`.
pub fn sample_metadata(game_name: &str) -> MatchMetadata {
    MatchMetadata::new(game_name, 2)
}

/// Create options built from the sample fixtures.
pub fn sample_create_opts(game_name: &str) -> CreateMatchOpts {
    CreateMatchOpts {
        metadata: sample_metadata(game_name),
        initial_state: sample_state(),
    }
}

/// State at `version` with no game data.
pub fn versioned_state(version: u64) -> State {
    State::with_version(version)
}

/// A move entry as written by the game master.
pub fn move_entry(turn: u32) -> LogEntry {
    LogEntry::new("MAKE_MOVE").at_turn(turn)
}

/// A game event entry (end turn, end phase...).
pub fn event_entry(turn: u32) -> LogEntry {
    LogEntry::new("GAME_EVENT").at_turn(turn)
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    /// Short alphanumeric match IDs drawn from a small pool, so collisions
    /// between generated operations actually happen.
    pub fn arb_match_id() -> impl Strategy<Value = MatchId> {
        "m[0-4]".prop_map(MatchId::from)
    }

    pub fn arb_version() -> impl Strategy<Value = u64> {
        0u64..32
    }

    pub fn arb_state() -> impl Strategy<Value = State> {
        (arb_version(), any::<i32>()).prop_map(|(version, score)| State {
            state_id: version,
            g: serde_json::json!({ "score": score }),
            ctx: serde_json::json!({ "turn": version }),
            plugins: serde_json::Value::Null,
        })
    }

    pub fn arb_log_entry() -> impl Strategy<Value = LogEntry> {
        (
            prop_oneof![Just("MAKE_MOVE"), Just("GAME_EVENT"), Just("UNDO"), Just("REDO")],
            0u32..20,
        )
            .prop_map(|(action, turn)| LogEntry::new(action).at_turn(turn))
    }

    pub fn arb_deltalog() -> impl Strategy<Value = Vec<LogEntry>> {
        prop::collection::vec(arb_log_entry(), 0..4)
    }

    pub fn arb_metadata() -> impl Strategy<Value = MatchMetadata> {
        (prop_oneof![Just("A"), Just("B"), Just("C")], 1u32..5)
            .prop_map(|(game, players)| MatchMetadata::new(game, players))
    }
}
