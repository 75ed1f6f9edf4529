//! Maximal Marginal Relevance diversification (spec §4.2 stage 7, optional).
//!
//! No direct teacher precedent; grounded on the `cosine_similarity` helper
//! already defined for the embedder port
//! (`ports::default::fastembed_embedder::cosine_similarity`) and the
//! greedy-selection shape of the spec's own formula.

use crate::data::Document;

/// Greedily select `top_k` documents minimizing
/// `λ·max_pair_sim(d, selected) − (1−λ)·relevance(d)`.
///
/// `candidates` must already be sorted by descending `relevance`; ties in
/// the greedy step favor the earlier (higher-relevance) candidate.
pub fn mmr_select(candidates: Vec<(Document, f32)>, top_k: usize, lambda: f32) -> Vec<(Document, f32)> {
    if lambda <= 0.0 || candidates.is_empty() {
        return candidates.into_iter().take(top_k).collect();
    }

    let mut remaining = candidates;
    let mut selected: Vec<(Document, f32)> = Vec::with_capacity(top_k.min(remaining.len()));

    while !remaining.is_empty() && selected.len() < top_k {
        let mut best_idx = 0;
        let mut best_score = f32::MIN;
        for (i, (doc, relevance)) in remaining.iter().enumerate() {
            let max_sim = selected
                .iter()
                .map(|(s, _)| cosine_similarity(&doc.embedding, &s.embedding))
                .fold(0.0_f32, f32::max);
            let mmr_score = (1.0 - lambda) * relevance - lambda * max_sim;
            if mmr_score > best_score {
                best_score = mmr_score;
                best_idx = i;
            }
        }
        selected.push(remaining.remove(best_idx));
    }
    selected
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
