//! Entity: a graph node (spec §3).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Closed set of entity types (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Date,
    Concept,
    Product,
    Document,
}

/// A resolved entity. `document_ids` must stay a subset of indexed document
/// ids; callers are responsible for that invariant (graph store enforces it
/// on insert via [`crate::graph::store::GraphStore`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub entity_type: EntityType,
    pub document_ids: BTreeSet<String>,
    pub properties: BTreeMap<String, String>,
}

impl Entity {
    /// Case-folded, trimmed lookup key used for exact-match resolution
    /// (spec §4.3 stage 7, §4.5).
    pub fn normalize_name(name: &str) -> String {
        name.trim().to_lowercase()
    }

    pub fn lookup_key(&self) -> String {
        Self::normalize_name(&self.name)
    }
}
