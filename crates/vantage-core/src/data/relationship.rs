//! Relationship: a directed graph edge (spec §3).

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;

/// Closed set of relationship types (spec §3). `CO_OCCURS` and friends are
/// open-ended in the source prose ("…"); the spec names these six plus an
/// explicit ellipsis, so `Other(String)` captures anything an extractor
/// emits beyond the fixed six without losing information. Serialized as a
/// plain `SCREAMING_SNAKE_CASE` string either way.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationshipType {
    Mentions,
    CoOccurs,
    WorksAt,
    LocatedIn,
    RelatedTo,
    CreatedBy,
    Other(String),
}

impl RelationshipType {
    fn as_str(&self) -> &str {
        match self {
            RelationshipType::Mentions => "MENTIONS",
            RelationshipType::CoOccurs => "CO_OCCURS",
            RelationshipType::WorksAt => "WORKS_AT",
            RelationshipType::LocatedIn => "LOCATED_IN",
            RelationshipType::RelatedTo => "RELATED_TO",
            RelationshipType::CreatedBy => "CREATED_BY",
            RelationshipType::Other(s) => s,
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "MENTIONS" => RelationshipType::Mentions,
            "CO_OCCURS" => RelationshipType::CoOccurs,
            "WORKS_AT" => RelationshipType::WorksAt,
            "LOCATED_IN" => RelationshipType::LocatedIn,
            "RELATED_TO" => RelationshipType::RelatedTo,
            "CREATED_BY" => RelationshipType::CreatedBy,
            other => RelationshipType::Other(other.to_string()),
        }
    }
}

impl Serialize for RelationshipType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RelationshipType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer).map_err(D::Error::custom)?;
        Ok(RelationshipType::from_str(&s))
    }
}

impl RelationshipType {
    /// Non-`MENTIONS` edges are what keep an entity alive after its last
    /// authoring document is deleted (Open Question #4 resolution).
    pub fn is_mentions(&self) -> bool {
        matches!(self, RelationshipType::Mentions)
    }
}

/// A directed edge between two entities. Identity is `(source_id,
/// target_id, edge_type)`. `weight` is monotonically non-decreasing on
/// positive reinforcement and capped at 1.0 (spec §3, §4.3 stage 7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub source_id: String,
    pub target_id: String,
    pub edge_type: RelationshipType,
    pub weight: f32,
    pub document_ids: BTreeSet<String>,
}

/// Reinforcement factor applied when an edge is observed again (spec §4.3
/// stage 7: `w ← min(1.0, w·1.1)`).
pub const REINFORCEMENT_FACTOR: f32 = 1.1;

impl Relationship {
    pub fn new(source_id: String, target_id: String, edge_type: RelationshipType, initial_weight: f32) -> Self {
        Self {
            source_id,
            target_id,
            edge_type,
            weight: initial_weight.clamp(0.0, 1.0),
            document_ids: BTreeSet::new(),
        }
    }

    /// Strengthen the edge on repeated observation, capped at 1.0.
    pub fn reinforce(&mut self) {
        self.weight = (self.weight * REINFORCEMENT_FACTOR).min(1.0);
    }
}
