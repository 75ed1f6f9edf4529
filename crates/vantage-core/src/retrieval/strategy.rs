//! Retrieval strategy selection (spec §4.2 stage 1).
//!
//! No direct teacher precedent; grounded on `search::hybrid::HybridSearcher
//! ::should_use_semantic`'s query-feature heuristics, generalized to the
//! five named strategies instead of a binary keyword/semantic choice.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    Precise,
    Semantic,
    Exploratory,
    Temporal,
    Hybrid,
}

/// Per-strategy fusion/weighting parameters (spec §4.2 stage 1 table).
#[derive(Debug, Clone, Copy)]
pub struct StrategyParams {
    pub lexical_weight: f32,
    pub vector_weight: f32,
    pub min_score: f32,
    pub graph_weight: f32,
    pub graph_hops: u32,
    pub time_weight: f32,
    pub prefer_recent: bool,
}

impl Strategy {
    pub fn params(self) -> StrategyParams {
        match self {
            Strategy::Precise => StrategyParams {
                lexical_weight: 1.0,
                vector_weight: 0.0,
                min_score: 0.5,
                graph_weight: 0.0,
                graph_hops: 0,
                time_weight: 0.0,
                prefer_recent: false,
            },
            Strategy::Semantic => StrategyParams {
                lexical_weight: 0.3,
                vector_weight: 0.7,
                min_score: 0.3,
                graph_weight: 0.0,
                graph_hops: 0,
                time_weight: 0.0,
                prefer_recent: false,
            },
            Strategy::Hybrid => StrategyParams {
                lexical_weight: 0.3,
                vector_weight: 0.7,
                min_score: 0.3,
                graph_weight: 0.0,
                graph_hops: 0,
                time_weight: 0.0,
                prefer_recent: false,
            },
            Strategy::Exploratory => StrategyParams {
                lexical_weight: 0.3,
                vector_weight: 0.7,
                min_score: 0.3,
                graph_weight: 0.3,
                graph_hops: 2,
                time_weight: 0.0,
                prefer_recent: false,
            },
            Strategy::Temporal => StrategyParams {
                lexical_weight: 0.3,
                vector_weight: 0.7,
                min_score: 0.3,
                graph_weight: 0.0,
                graph_hops: 0,
                time_weight: 0.2,
                prefer_recent: true,
            },
        }
    }
}

/// Query features used for strategy selection.
#[derive(Debug, Clone, Default)]
pub struct QueryFeatures {
    pub token_count: usize,
    pub has_date_terms: bool,
    pub has_file_type_cue: bool,
    pub entity_count: usize,
    pub is_exploratory_intent: bool,
}

impl QueryFeatures {
    pub fn extract(query: &str, entity_count: usize, is_exploratory_intent: bool) -> Self {
        let lower = query.to_lowercase();
        let has_date_terms = ["yesterday", "today", "last week", "last month", "recent", "2024", "2025", "2026"]
            .iter()
            .any(|t| lower.contains(t));
        let has_file_type_cue = [".pdf", ".docx", ".xlsx", ".csv", ".txt", "file", "document"].iter().any(|t| lower.contains(t));
        Self {
            token_count: query.split_whitespace().count(),
            has_date_terms,
            has_file_type_cue,
            entity_count,
            is_exploratory_intent,
        }
    }
}

/// Select a strategy from query features (spec §4.2 stage 1). HYBRID is the
/// default for a mixed document set.
pub fn select_strategy(features: &QueryFeatures) -> Strategy {
    if features.is_exploratory_intent && features.entity_count > 0 {
        return Strategy::Exploratory;
    }
    if features.has_date_terms {
        return Strategy::Temporal;
    }
    if features.has_file_type_cue && features.token_count <= 4 {
        return Strategy::Precise;
    }
    if features.token_count >= 6 {
        return Strategy::Semantic;
    }
    Strategy::Hybrid
}
