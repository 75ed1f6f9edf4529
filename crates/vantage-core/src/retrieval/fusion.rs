//! Reciprocal Rank Fusion (spec §4.2 stage 4).
//!
//! Grounded on `search::hybrid::reciprocal_rank_fusion`; adapted to work
//! directly over the `VectorHit`/`LexicalHit` port return types instead of
//! `(String, f32)` pairs.

use crate::ports::{LexicalHit, VectorHit};
use std::collections::HashMap;

/// `score(d) = Σ 1/(k+rank_i(d))`, rank is 1-based, absent ranks contribute
/// 0 (spec §4.2 stage 4). Input lists are assumed already sorted by
/// descending relevance.
pub fn reciprocal_rank_fusion(vector_hits: &[VectorHit], lexical_hits: &[LexicalHit], k: f32) -> Vec<(String, f32)> {
    let mut scores: HashMap<String, f32> = HashMap::new();

    for (rank, hit) in vector_hits.iter().enumerate() {
        *scores.entry(hit.doc_id.clone()).or_default() += 1.0 / (k + (rank + 1) as f32);
    }
    for (rank, hit) in lexical_hits.iter().enumerate() {
        *scores.entry(hit.doc_id.clone()).or_default() += 1.0 / (k + (rank + 1) as f32);
    }

    let mut results: Vec<(String, f32)> = scores.into_iter().collect();
    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    results
}

/// Additive graph-augmentation contribution (spec §4.2 stage 5):
/// `graph_weight * (1/(1+hop))` per entity-adjacent document, merged into
/// the fused candidate set.
pub fn apply_graph_augmentation(fused: &mut Vec<(String, f32)>, graph_docs: &[(String, u32)], graph_weight: f32) {
    let mut index: HashMap<String, usize> = fused.iter().enumerate().map(|(i, (id, _))| (id.clone(), i)).collect();
    for (doc_id, hop) in graph_docs {
        let contribution = graph_weight * (1.0 / (1.0 + *hop as f32));
        if let Some(&i) = index.get(doc_id) {
            fused[i].1 += contribution;
        } else {
            index.insert(doc_id.clone(), fused.len());
            fused.push((doc_id.clone(), contribution));
        }
    }
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
}
