//! The hybrid retrieval + rerank pipeline (spec §4.2): the full 8-step
//! contract composed from `strategy`, `fusion`, `rerank`, and `mmr`.

use super::fusion::{apply_graph_augmentation, reciprocal_rank_fusion};
use super::mmr::mmr_select;
use super::rerank::rerank;
use super::strategy::{select_strategy, QueryFeatures, Strategy};
use crate::config::SearchConfig;
use crate::data::ScoredDocument;
use crate::error::{EngineError, EngineResult};
use crate::graph::GraphStore;
use crate::ports::{Embedder, Filters, LexicalStore, RelationalStore, Reranker, VectorStore};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct RetrievalRequest {
    pub query: String,
    pub filters: Filters,
    pub top_k: usize,
    pub strategy: Option<Strategy>,
    /// Entity names already resolved from the query (by the orchestrator's
    /// classify stage), used for graph augmentation under EXPLORATORY.
    pub entity_names: Vec<String>,
}

#[derive(Debug, Default)]
pub struct RetrievalOutcome {
    pub results: Vec<ScoredDocument>,
    pub raw_scores: Vec<(String, f32)>,
    pub search_time: Duration,
    /// Set when a store fell back to a degraded path (spec §7 propagation
    /// policy: vector store down → lexical-only, etc.).
    pub degraded: bool,
}

pub struct RetrievalPipeline {
    vector_store: Arc<dyn VectorStore>,
    lexical_store: Arc<dyn LexicalStore>,
    embedder: Arc<dyn Embedder>,
    reranker: Option<Arc<dyn Reranker>>,
    relational: Arc<dyn RelationalStore>,
    graph: Option<Arc<GraphStore>>,
    config: SearchConfig,
}

impl RetrievalPipeline {
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        lexical_store: Arc<dyn LexicalStore>,
        embedder: Arc<dyn Embedder>,
        reranker: Option<Arc<dyn Reranker>>,
        relational: Arc<dyn RelationalStore>,
        graph: Option<Arc<GraphStore>>,
        config: SearchConfig,
    ) -> Self {
        Self { vector_store, lexical_store, embedder, reranker, relational, graph, config }
    }

    pub async fn retrieve(&self, request: RetrievalRequest) -> EngineResult<RetrievalOutcome> {
        let started = Instant::now();

        if request.query.is_empty() || request.query.chars().count() > 1000 {
            return Err(EngineError::input_invalid("query must be 1..=1000 characters"));
        }
        if request.top_k == 0 {
            return Err(EngineError::input_invalid("top_k must be >= 1"));
        }

        let features = QueryFeatures::extract(&request.query, request.entity_names.len(), request.strategy == Some(Strategy::Exploratory));
        let strategy = request.strategy.unwrap_or_else(|| select_strategy(&features));
        let params = strategy.params();

        let query_embedding = self.embedder.embed(&request.query).await?;
        if query_embedding.len() != self.vector_store.dim() {
            return Err(EngineError::InputInvalid(format!(
                "query embedding dimension {} does not match store dimension {}",
                query_embedding.len(),
                self.vector_store.dim()
            )));
        }

        let recall = self.config.recall_top_k;
        let (vector_result, lexical_result) =
            tokio::join!(self.vector_store.knn(&query_embedding, recall, &request.filters), self.lexical_store.multi_match(&request.query, recall, &request.filters));

        let mut degraded = false;
        let vector_hits = match vector_result {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("vector store unavailable, falling back to lexical-only: {e}");
                degraded = true;
                Vec::new()
            }
        };
        let lexical_hits = match lexical_result {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("lexical store unavailable, falling back to vector-only: {e}");
                degraded = true;
                Vec::new()
            }
        };
        if vector_hits.is_empty() && lexical_hits.is_empty() {
            return Ok(RetrievalOutcome { results: Vec::new(), raw_scores: Vec::new(), search_time: started.elapsed(), degraded });
        }

        let mut fused = reciprocal_rank_fusion(&vector_hits, &lexical_hits, self.config.rrf_k);

        if (strategy == Strategy::Exploratory || params.graph_weight > 0.0) && !request.entity_names.is_empty() {
            if let Some(graph) = &self.graph {
                let expansion = crate::graph::expand(graph, &request.entity_names, params.graph_hops.max(self.config.graph_max_hops as u32));
                apply_graph_augmentation(&mut fused, &expansion.related_document_hops, params.graph_weight);
            }
        }

        fused.retain(|(_, score)| *score >= 0.0);
        let min_score = params.min_score;
        let raw_scores = fused.clone();

        let candidate_ids: Vec<String> = fused.into_iter().map(|(id, _)| id).take(self.config.recall_top_k).collect();
        let mut candidates = Vec::with_capacity(candidate_ids.len());
        for id in &candidate_ids {
            if let Ok(Some(doc)) = self.relational.get_document(id).await {
                candidates.push(doc);
            }
        }

        let was_reranked = self.config.rerank_enabled && self.reranker.is_some();
        let mut scored: Vec<(crate::data::Document, f32)> = if was_reranked {
            rerank(self.reranker.as_ref().unwrap(), &request.query, candidates, self.config.rerank_batch_size).await
        } else {
            let raw_lookup: std::collections::HashMap<&str, f32> = raw_scores.iter().map(|(id, s)| (id.as_str(), *s)).collect();
            candidates.into_iter().map(|d| { let s = *raw_lookup.get(d.id.as_str()).unwrap_or(&0.0); (d, s) }).collect()
        };

        // `min_score` is calibrated against the reranker's sigmoid-normalized
        // [0,1] scores (spec §4.2 step 6); when reranking is unavailable the
        // candidates carry their raw fused RRF score instead, which is on a
        // different scale, so the floor is skipped in that fallback path
        // (spec §7: "cross-encoder unavailable → skip rerank").
        if was_reranked {
            scored.retain(|(_, score)| *score >= min_score);
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let diversified = if self.config.diversity_weight > 0.0 {
            mmr_select(scored, request.top_k, self.config.diversity_weight)
        } else {
            scored.into_iter().take(request.top_k).collect()
        };

        let results = diversified.into_iter().map(|(document, score)| ScoredDocument { document, score, highlights: None }).collect();

        Ok(RetrievalOutcome { results, raw_scores, search_time: started.elapsed(), degraded })
    }
}
