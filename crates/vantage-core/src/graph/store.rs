//! `GraphStore`: arena+index ownership of entities and edges (spec §9
//! "Cyclic ownership" redesign flag).
//!
//! Entities and relationships are persisted by the relational port; this
//! store is the in-memory single-writer/multi-reader working copy used by
//! the graph expansion stage and kept in sync with ingestion's graph-update
//! stage (spec §4.3 stage 7, §5 "Graph" shared-resource note).

use crate::data::{Entity, Relationship, RelationshipType};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// In-memory entity graph, checkpointed through the relational port by its
/// owner (the memory coordinator / ingestion graph-update stage). Readers
/// take a shared lock; writers take an exclusive lock; both non-reentrant
/// (spec §5).
#[derive(Default)]
pub struct GraphStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    entities: HashMap<String, Entity>,
    name_index: HashMap<String, Vec<String>>,
    /// Adjacency by source entity id.
    edges: HashMap<String, Vec<Relationship>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_entity(&self, entity: Entity) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let key = entity.lookup_key();
        inner.name_index.entry(key).or_default().push(entity.id.clone());
        inner.entities.insert(entity.id.clone(), entity);
    }

    pub fn get_entity(&self, id: &str) -> Option<Entity> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.entities.get(id).cloned()
    }

    /// Exact-match lookup by normalized name; ambiguous matches return all
    /// candidates (spec §4.5: "if ambiguous, keep all candidates").
    pub fn find_by_name(&self, name: &str) -> Vec<Entity> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let key = Entity::normalize_name(name);
        inner
            .name_index
            .get(&key)
            .map(|ids| ids.iter().filter_map(|id| inner.entities.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn upsert_edge(&self, edge: Relationship) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let bucket = inner.edges.entry(edge.source_id.clone()).or_default();
        if let Some(existing) = bucket
            .iter_mut()
            .find(|e| e.target_id == edge.target_id && e.edge_type == edge.edge_type)
        {
            existing.reinforce();
            existing.document_ids.extend(edge.document_ids);
        } else {
            bucket.push(edge);
        }
    }

    pub fn edges_from(&self, entity_id: &str) -> Vec<Relationship> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.edges.get(entity_id).cloned().unwrap_or_default()
    }

    /// All edges touching `entity_id`, either direction.
    pub fn edges_touching(&self, entity_id: &str) -> Vec<Relationship> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<Relationship> = inner.edges.get(entity_id).cloned().unwrap_or_default();
        for edges in inner.edges.values() {
            out.extend(edges.iter().filter(|e| e.target_id == entity_id).cloned());
        }
        out
    }

    /// Remove a document from every `MENTIONS` edge's witness set, dropping
    /// edges that become empty; return ids of entities whose
    /// `document_ids` became empty and have no remaining non-`MENTIONS`
    /// edge (Open Question #4's binding resolution).
    pub fn remove_document(&self, doc_id: &str) -> Vec<String> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());

        let mut touched_entities: HashSet<String> = HashSet::new();
        for (source, edges) in inner.edges.iter_mut() {
            edges.retain_mut(|e| {
                if e.edge_type.is_mentions() {
                    e.document_ids.remove(doc_id);
                    touched_entities.insert(source.clone());
                    touched_entities.insert(e.target_id.clone());
                    !e.document_ids.is_empty()
                } else {
                    true
                }
            });
        }
        for entity in inner.entities.values_mut() {
            entity.document_ids.remove(doc_id);
        }

        let mut removable = Vec::new();
        for id in touched_entities {
            let empty_docs = inner.entities.get(&id).map(|e| e.document_ids.is_empty()).unwrap_or(false);
            if !empty_docs {
                continue;
            }
            let has_non_mentions_edge = inner
                .edges
                .get(&id)
                .map(|edges| edges.iter().any(|e| !e.edge_type.is_mentions()))
                .unwrap_or(false)
                || inner
                    .edges
                    .values()
                    .any(|edges| edges.iter().any(|e| e.target_id == id && !e.edge_type.is_mentions()));
            if !has_non_mentions_edge {
                removable.push(id);
            }
        }

        for id in &removable {
            if let Some(entity) = inner.entities.remove(id) {
                let key = entity.lookup_key();
                if let Some(ids) = inner.name_index.get_mut(&key) {
                    ids.retain(|i| i != id);
                }
            }
            inner.edges.remove(id);
        }
        removable
    }

    /// All entities of a given type, for fuzzy-match candidate generation
    /// (spec §4.3 stage 7).
    pub fn entities_of_type(&self, entity_type: crate::data::EntityType) -> Vec<Entity> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.entities.values().filter(|e| e.entity_type == entity_type).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
