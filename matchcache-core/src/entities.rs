//! Match record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Logical clock carried by every [`State`].
pub type Version = u64;

// ============================================================================
// IDENTITY
// ============================================================================

/// Opaque match identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MatchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MatchId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for MatchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// STATE
// ============================================================================

/// Game state snapshot.
///
/// `state_id` orders writes. A serialized state without `_stateID` reads
/// back as version 0, the oldest possible value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct State {
    #[serde(rename = "_stateID", default)]
    pub state_id: Version,
    /// Game-specific data.
    #[serde(rename = "G", default)]
    pub g: Value,
    /// Framework context (turn, phase, current player...).
    #[serde(default)]
    pub ctx: Value,
    #[serde(default)]
    pub plugins: Value,
}

impl State {
    /// Create an empty state at the given version.
    pub fn with_version(state_id: Version) -> Self {
        Self {
            state_id,
            ..Default::default()
        }
    }

    /// Version used to order concurrent writes.
    pub fn version(&self) -> Version {
        self.state_id
    }

    /// True if this state was produced strictly after `other`.
    pub fn is_newer_than(&self, other: &State) -> bool {
        self.state_id > other.state_id
    }
}

// ============================================================================
// LOG
// ============================================================================

/// The action recorded by a log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogAction {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub payload: Value,
}

/// A single entry of the append-only match log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub action: LogAction,
    #[serde(rename = "_stateID", default)]
    pub state_id: Version,
    #[serde(default)]
    pub turn: u32,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub redact: bool,
    #[serde(default)]
    pub automatic: bool,
}

impl LogEntry {
    /// Build an entry for an action with an empty payload.
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action: LogAction {
                action_type: action_type.into(),
                payload: Value::Null,
            },
            state_id: 0,
            turn: 0,
            phase: String::new(),
            redact: false,
            automatic: false,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.action.payload = payload;
        self
    }

    pub fn at_turn(mut self, turn: u32) -> Self {
        self.turn = turn;
        self
    }
}

// ============================================================================
// METADATA
// ============================================================================

/// Seat information for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMetadata {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_connected: Option<bool>,
}

impl PlayerMetadata {
    pub fn seat(id: u32) -> Self {
        Self {
            id,
            name: None,
            credentials: None,
            data: None,
            is_connected: None,
        }
    }
}

/// Descriptive data about a match. Carries no ordering semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMetadata {
    pub game_name: String,
    #[serde(default)]
    pub players: BTreeMap<u32, PlayerMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gameover: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_match_id: Option<MatchId>,
    #[serde(default)]
    pub unlisted: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MatchMetadata {
    /// Metadata for a fresh match with `num_players` empty seats.
    pub fn new(game_name: impl Into<String>, num_players: u32) -> Self {
        let now = Utc::now();
        Self {
            game_name: game_name.into(),
            players: (0..num_players)
                .map(|id| (id, PlayerMetadata::seat(id)))
                .collect(),
            setup_data: None,
            gameover: None,
            next_match_id: None,
            unlisted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_gameover(&self) -> bool {
        self.gameover.is_some()
    }
}

// ============================================================================
// OPERATION PAYLOADS
// ============================================================================

/// Payload for creating a match.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMatchOpts {
    pub metadata: MatchMetadata,
    pub initial_state: State,
}

/// Metadata predicates applied by `list_matches`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchFilter {
    pub is_gameover: Option<bool>,
    pub updated_before: Option<Timestamp>,
    pub updated_after: Option<Timestamp>,
}

/// Options for listing matches. An empty value lists everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListMatchesOpts {
    pub game_name: Option<String>,
    pub filter: MatchFilter,
}

impl ListMatchesOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn game_name(mut self, name: impl Into<String>) -> Self {
        self.game_name = Some(name.into());
        self
    }

    pub fn gameover(mut self, is_gameover: bool) -> Self {
        self.filter.is_gameover = Some(is_gameover);
        self
    }

    pub fn updated_before(mut self, at: Timestamp) -> Self {
        self.filter.updated_before = Some(at);
        self
    }

    pub fn updated_after(mut self, at: Timestamp) -> Self {
        self.filter.updated_after = Some(at);
        self
    }

    /// Check whether a match with `metadata` passes every set predicate.
    pub fn matches(&self, metadata: &MatchMetadata) -> bool {
        if let Some(name) = &self.game_name {
            if &metadata.game_name != name {
                return false;
            }
        }
        if let Some(is_gameover) = self.filter.is_gameover {
            if metadata.is_gameover() != is_gameover {
                return false;
            }
        }
        if let Some(before) = self.filter.updated_before {
            if metadata.updated_at >= before {
                return false;
            }
        }
        if let Some(after) = self.filter.updated_after {
            if metadata.updated_at <= after {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_state_without_version_reads_as_zero() {
        let state: State = serde_json::from_value(json!({ "G": { "cells": [] } })).unwrap();
        assert_eq!(state.version(), 0);
        assert_eq!(state.g, json!({ "cells": [] }));
    }

    #[test]
    fn test_state_version_serializes_as_state_id() {
        let value = serde_json::to_value(State::with_version(7)).unwrap();
        assert_eq!(value["_stateID"], json!(7));
    }

    #[test]
    fn test_state_is_newer_than() {
        assert!(State::with_version(2).is_newer_than(&State::with_version(1)));
        assert!(!State::with_version(1).is_newer_than(&State::with_version(1)));
    }

    #[test]
    fn test_match_id_display_and_conversions() {
        let id = MatchId::from("abc");
        assert_eq!(id.to_string(), "abc");
        assert_eq!(id, MatchId::new(String::from("abc")));
        assert_eq!(id.as_ref(), "abc");
    }

    #[test]
    fn test_metadata_new_creates_seats() {
        let metadata = MatchMetadata::new("chess", 2);
        assert_eq!(metadata.players.len(), 2);
        assert_eq!(metadata.players[&1].id, 1);
        assert!(!metadata.is_gameover());
    }

    #[test]
    fn test_list_opts_game_name_filter() {
        let opts = ListMatchesOpts::new().game_name("A");
        assert!(opts.matches(&MatchMetadata::new("A", 2)));
        assert!(!opts.matches(&MatchMetadata::new("B", 2)));
    }

    #[test]
    fn test_list_opts_gameover_filter() {
        let mut finished = MatchMetadata::new("A", 2);
        finished.gameover = Some(json!({ "winner": "0" }));
        let running = MatchMetadata::new("A", 2);

        let opts = ListMatchesOpts::new().gameover(true);
        assert!(opts.matches(&finished));
        assert!(!opts.matches(&running));
    }

    #[test]
    fn test_list_opts_updated_window() {
        let metadata = MatchMetadata::new("A", 2);
        let earlier = metadata.updated_at - Duration::seconds(10);
        let later = metadata.updated_at + Duration::seconds(10);

        assert!(ListMatchesOpts::new()
            .updated_after(earlier)
            .updated_before(later)
            .matches(&metadata));
        assert!(!ListMatchesOpts::new().updated_before(earlier).matches(&metadata));
        assert!(!ListMatchesOpts::new().updated_after(later).matches(&metadata));
    }
}
