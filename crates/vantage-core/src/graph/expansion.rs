//! Entity graph expansion (spec §4.5): bounded BFS from resolved entity
//! names, unioning related entities and their authoring documents.

use super::store::GraphStore;
use crate::data::Relationship;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// `(source, edge_type, dst)` triple recording one BFS hop.
pub type GraphPath = (String, String, String);

#[derive(Debug, Clone, Default)]
pub struct ExpansionResult {
    pub original: Vec<String>,
    pub expanded: Vec<String>,
    pub related_document_ids: Vec<String>,
    /// Minimum BFS hop distance at which each document in
    /// `related_document_ids` was reached (0 for documents authored by an
    /// originally resolved entity), feeding the §4.2 graph-weight decay.
    pub related_document_hops: Vec<(String, u32)>,
    pub paths: Vec<GraphPath>,
}

/// Expand `entity_names` up to `max_hops` (spec §4.5). Ambiguous name
/// lookups keep every candidate; RRF/rerank downstream filter irrelevant
/// matches. Cycles terminate via a visited-set.
pub fn expand(store: &GraphStore, entity_names: &[String], max_hops: u32) -> ExpansionResult {
    let mut original_ids = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, u32)> = VecDeque::new();

    for name in entity_names {
        for entity in store.find_by_name(name) {
            if visited.insert(entity.id.clone()) {
                original_ids.push(entity.id.clone());
                queue.push_back((entity.id.clone(), 0));
            }
        }
    }

    let mut expanded: BTreeSet<String> = BTreeSet::new();
    let mut related_documents: BTreeMap<String, u32> = BTreeMap::new();
    let mut paths: Vec<GraphPath> = Vec::new();

    for id in &original_ids {
        if let Some(entity) = store.get_entity(id) {
            for doc_id in entity.document_ids {
                related_documents.entry(doc_id).or_insert(0);
            }
        }
    }

    while let Some((current, hop)) = queue.pop_front() {
        if hop >= max_hops {
            continue;
        }
        let edges: Vec<Relationship> = store.edges_from(&current);
        for edge in edges {
            paths.push((edge.source_id.clone(), format!("{:?}", edge.edge_type), edge.target_id.clone()));
            if visited.insert(edge.target_id.clone()) {
                expanded.insert(edge.target_id.clone());
                let next_hop = hop + 1;
                if let Some(target) = store.get_entity(&edge.target_id) {
                    for doc_id in target.document_ids {
                        related_documents.entry(doc_id).or_insert(next_hop);
                    }
                }
                queue.push_back((edge.target_id.clone(), next_hop));
            }
        }
    }

    ExpansionResult {
        original: original_ids,
        expanded: expanded.into_iter().collect(),
        related_document_ids: related_documents.keys().cloned().collect(),
        related_document_hops: related_documents.into_iter().collect(),
        paths,
    }
}
