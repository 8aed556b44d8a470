//! In-memory match storage.
//!
//! Reference backend used by tests and local development. Every field is
//! stored independently, so a match can have a log without metadata (for
//! example after `set_state` on a match that was never created).

use std::collections::HashMap;

use async_trait::async_trait;
use matchcache_core::{
    CreateMatchOpts, FetchFields, FetchResult, FieldKind, ListMatchesOpts, LogEntry,
    MatchCacheResult, MatchId, MatchMetadata, State,
};
use tokio::sync::RwLock;

use crate::traits::MatchStorage;

#[derive(Debug, Clone, Default)]
struct StoredMatch {
    metadata: Option<MatchMetadata>,
    state: Option<State>,
    initial_state: Option<State>,
    log: Option<Vec<LogEntry>>,
}

/// In-memory storage backend.
///
/// Uses tokio::sync::RwLock for safe async access.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    matches: RwLock<HashMap<MatchId, StoredMatch>>,
}

impl InMemoryStorage {
    /// Create a new empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of matches with any stored field.
    pub async fn match_count(&self) -> usize {
        self.matches.read().await.len()
    }
}

#[async_trait]
impl MatchStorage for InMemoryStorage {
    async fn create_match(
        &self,
        match_id: &MatchId,
        opts: CreateMatchOpts,
    ) -> MatchCacheResult<()> {
        let mut matches = self.matches.write().await;
        matches.insert(
            match_id.clone(),
            StoredMatch {
                metadata: Some(opts.metadata),
                state: Some(opts.initial_state.clone()),
                initial_state: Some(opts.initial_state),
                log: Some(Vec::new()),
            },
        );
        Ok(())
    }

    async fn set_state(
        &self,
        match_id: &MatchId,
        state: &State,
        deltalog: Option<&[LogEntry]>,
    ) -> MatchCacheResult<()> {
        let mut matches = self.matches.write().await;
        let stored = matches.entry(match_id.clone()).or_default();
        stored.state = Some(state.clone());
        if let Some(delta) = deltalog.filter(|delta| !delta.is_empty()) {
            stored
                .log
                .get_or_insert_with(Vec::new)
                .extend_from_slice(delta);
        }
        Ok(())
    }

    async fn set_metadata(
        &self,
        match_id: &MatchId,
        metadata: &MatchMetadata,
    ) -> MatchCacheResult<()> {
        let mut matches = self.matches.write().await;
        matches.entry(match_id.clone()).or_default().metadata = Some(metadata.clone());
        Ok(())
    }

    async fn fetch(&self, match_id: &MatchId, fields: FetchFields) -> MatchCacheResult<FetchResult> {
        let matches = self.matches.read().await;
        let Some(stored) = matches.get(match_id) else {
            return Ok(FetchResult::default());
        };

        let mut result = FetchResult::default();
        for kind in fields.kinds() {
            match kind {
                FieldKind::Metadata => result.metadata = stored.metadata.clone(),
                FieldKind::State => result.state = stored.state.clone(),
                FieldKind::InitialState => result.initial_state = stored.initial_state.clone(),
                FieldKind::Log => result.log = stored.log.clone(),
            }
        }
        Ok(result)
    }

    async fn wipe(&self, match_id: &MatchId) -> MatchCacheResult<()> {
        self.matches.write().await.remove(match_id);
        Ok(())
    }

    async fn list_matches(&self, opts: &ListMatchesOpts) -> MatchCacheResult<Vec<MatchId>> {
        let matches = self.matches.read().await;
        let mut ids: Vec<MatchId> = matches
            .iter()
            .filter(|(_, stored)| {
                stored
                    .metadata
                    .as_ref()
                    .is_some_and(|metadata| opts.matches(metadata))
            })
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
