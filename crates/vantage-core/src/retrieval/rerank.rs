//! Cross-encoder reranking stage (spec §4.2 stage 6).
//!
//! Grounded on `search::reranker::Reranker::rerank`'s candidate-batching
//! shape, adapted to call through the [`crate::ports::Reranker`] capability
//! port rather than owning a model directly.

use crate::data::Document;
use crate::ports::Reranker;
use std::sync::Arc;

/// Truncation applied to `full_content` when no `detailed_summary` is
/// available (spec §4.2 stage 6).
const FULL_CONTENT_CHARS: usize = 2000;

fn document_text(doc: &Document) -> String {
    if !doc.detailed_summary.trim().is_empty() {
        return doc.detailed_summary.clone();
    }
    doc.full_content.chars().take(FULL_CONTENT_CHARS).collect()
}

/// Rerank `candidates` against `query`, processing in batches of
/// `batch_size` (default 32). Scores come back sigmoid-normalized by the
/// port; this stage only sorts descending and pairs them back up.
pub async fn rerank(reranker: &Arc<dyn Reranker>, query: &str, candidates: Vec<Document>, batch_size: usize) -> Vec<(Document, f32)> {
    if candidates.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(Document, f32)> = Vec::with_capacity(candidates.len());
    for chunk in candidates.chunks(batch_size.max(1)) {
        let texts: Vec<String> = chunk.iter().map(document_text).collect();
        let scores = reranker.score(query, &texts).await.unwrap_or_else(|_| vec![0.0; chunk.len()]);
        for (doc, score) in chunk.iter().zip(scores) {
            scored.push((doc.clone(), score));
        }
    }
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
}
