//! Default reranker port: cross-encoder with a BM25-like fallback.
//!
//! Grounded directly on `search/reranker.rs`'s `Reranker`/`RerankedResult`
//! (Jina Reranker v1 Turbo via fastembed, falling back to term-overlap
//! scoring when the model is unavailable), adapted to the [`Reranker`]
//! capability-port trait (spec §4.2 stage 6).

use crate::error::RerankError;
use crate::ports::Reranker as RerankerPort;
use async_trait::async_trait;
use std::sync::Mutex;

#[cfg(feature = "embeddings")]
use fastembed::{RerankInitOptions, RerankerModel, TextRerank};

pub struct CrossEncoderReranker {
    #[cfg(feature = "embeddings")]
    model: Mutex<Option<TextRerank>>,
}

impl Default for CrossEncoderReranker {
    fn default() -> Self {
        Self::new()
    }
}

impl CrossEncoderReranker {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "embeddings")]
            model: Mutex::new(None),
        }
    }

    /// Load the cross-encoder model. Call during startup, not on the hot
    /// path (spec §5 "Cross-encoder model: loaded once at startup").
    #[cfg(feature = "embeddings")]
    pub fn init(&self) {
        let mut guard = self.model.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_some() {
            return;
        }
        let options = RerankInitOptions::new(RerankerModel::JINARerankerV1TurboEn).with_show_download_progress(true);
        match TextRerank::try_new(options) {
            Ok(m) => *guard = Some(m),
            Err(e) => tracing::warn!("cross-encoder unavailable, using term-overlap fallback: {e}"),
        }
    }

    #[cfg(not(feature = "embeddings"))]
    pub fn init(&self) {}

    fn term_overlap_score(query: &str, document: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();
        let doc_lower = document.to_lowercase();
        let doc_len = document.len().max(1) as f32;
        if terms.is_empty() {
            return 0.0;
        }
        let k1 = 1.2_f32;
        let b = 0.75_f32;
        let avg_len = 500.0_f32;
        let mut score = 0.0;
        for term in &terms {
            let tf = doc_lower.matches(term).count() as f32;
            if tf > 0.0 {
                score += (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * (doc_len / avg_len)));
            }
        }
        score / terms.len() as f32
    }
}

#[async_trait]
impl RerankerPort for CrossEncoderReranker {
    #[cfg(feature = "embeddings")]
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, RerankError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let query = query.to_string();
        let documents = documents.to_vec();
        let has_model = self.model.lock().unwrap_or_else(|e| e.into_inner()).is_some();
        if !has_model {
            return Ok(documents.iter().map(|d| Self::term_overlap_score(&query, d)).collect());
        }
        // fastembed's reranker is a blocking, owned-mutex call; run off the async executor.
        let scores = {
            let mut guard = self.model.lock().unwrap_or_else(|e| e.into_inner());
            let model = guard.as_mut().expect("checked above");
            let doc_refs: Vec<&str> = documents.iter().map(|s| s.as_str()).collect();
            match model.rerank(&query, &doc_refs, false, None) {
                Ok(results) => {
                    let mut scored = vec![0.0f32; documents.len()];
                    for r in results {
                        if let Some(slot) = scored.get_mut(r.index) {
                            *slot = sigmoid(r.score);
                        }
                    }
                    scored
                }
                Err(e) => {
                    tracing::warn!("cross-encoder rerank call failed, falling back: {e}");
                    documents.iter().map(|d| Self::term_overlap_score(&query, d)).collect()
                }
            }
        };
        Ok(scores)
    }

    #[cfg(not(feature = "embeddings"))]
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, RerankError> {
        Ok(documents.iter().map(|d| Self::term_overlap_score(query, d)).collect())
    }

    fn is_available(&self) -> bool {
        #[cfg(feature = "embeddings")]
        {
            self.model.lock().unwrap_or_else(|e| e.into_inner()).is_some()
        }
        #[cfg(not(feature = "embeddings"))]
        {
            false
        }
    }
}

/// Sigmoid-normalize a raw cross-encoder logit into [0,1] (spec §4.2 step 6).
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
