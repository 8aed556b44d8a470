//! Field selection for fetch requests

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::entities::{LogEntry, MatchMetadata, State};

/// One of the four independently stored parts of a match record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Metadata,
    State,
    InitialState,
    Log,
}

impl FieldKind {
    /// All field kinds in their canonical order.
    pub const ALL: [FieldKind; 4] = [
        FieldKind::Metadata,
        FieldKind::State,
        FieldKind::InitialState,
        FieldKind::Log,
    ];

    /// The single-bit selection for this field.
    pub fn flag(self) -> FetchFields {
        match self {
            FieldKind::Metadata => FetchFields::METADATA,
            FieldKind::State => FetchFields::STATE,
            FieldKind::InitialState => FetchFields::INITIAL_STATE,
            FieldKind::Log => FetchFields::LOG,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Metadata => "metadata",
            FieldKind::State => "state",
            FieldKind::InitialState => "initial_state",
            FieldKind::Log => "log",
        }
    }
}

bitflags! {
    /// Set of fields requested from a fetch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FetchFields: u8 {
        const METADATA = 0b0000_0001;
        const STATE = 0b0000_0010;
        const INITIAL_STATE = 0b0000_0100;
        const LOG = 0b0000_1000;
    }
}

impl FetchFields {
    /// Iterate the requested field kinds in canonical order.
    pub fn kinds(self) -> impl Iterator<Item = FieldKind> {
        FieldKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(kind.flag()))
    }

    pub fn requests(self, kind: FieldKind) -> bool {
        self.contains(kind.flag())
    }
}

impl From<FieldKind> for FetchFields {
    fn from(kind: FieldKind) -> Self {
        kind.flag()
    }
}

/// Partial match record returned by a fetch.
///
/// Only requested fields can be present; a requested field may still be
/// `None` when the match or that field does not exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResult {
    pub metadata: Option<MatchMetadata>,
    pub state: Option<State>,
    pub initial_state: Option<State>,
    pub log: Option<Vec<LogEntry>>,
}

impl FetchResult {
    /// True if no field is present.
    pub fn is_empty(&self) -> bool {
        self.metadata.is_none()
            && self.state.is_none()
            && self.initial_state.is_none()
            && self.log.is_none()
    }

    /// Whether the given field is present.
    pub fn has(&self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Metadata => self.metadata.is_some(),
            FieldKind::State => self.state.is_some(),
            FieldKind::InitialState => self.initial_state.is_some(),
            FieldKind::Log => self.log.is_some(),
        }
    }

    /// Drop every field not contained in `fields`.
    pub fn retain(mut self, fields: FetchFields) -> Self {
        if !fields.requests(FieldKind::Metadata) {
            self.metadata = None;
        }
        if !fields.requests(FieldKind::State) {
            self.state = None;
        }
        if !fields.requests(FieldKind::InitialState) {
            self.initial_state = None;
        }
        if !fields.requests(FieldKind::Log) {
            self.log = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_canonical_order() {
        let fields = FetchFields::LOG | FetchFields::METADATA | FetchFields::STATE;
        let kinds: Vec<_> = fields.kinds().collect();
        assert_eq!(
            kinds,
            vec![FieldKind::Metadata, FieldKind::State, FieldKind::Log]
        );
    }

    #[test]
    fn test_empty_selection_has_no_kinds() {
        assert_eq!(FetchFields::empty().kinds().count(), 0);
        assert_eq!(FetchFields::all().kinds().count(), 4);
    }

    #[test]
    fn test_retain_drops_unrequested_fields() {
        let result = FetchResult {
            state: Some(State::with_version(3)),
            log: Some(vec![]),
            ..Default::default()
        };
        let kept = result.retain(FetchFields::STATE);
        assert!(kept.has(FieldKind::State));
        assert!(!kept.has(FieldKind::Log));
    }
}
