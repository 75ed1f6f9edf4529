//! Hybrid retrieval + rerank pipeline (spec §4.2): strategy selection,
//! parallel vector/lexical fan-out, Reciprocal Rank Fusion, graph
//! augmentation, cross-encoder reranking, and optional MMR diversification.

pub mod fusion;
pub mod mmr;
pub mod pipeline;
pub mod rerank;
pub mod strategy;

pub use fusion::reciprocal_rank_fusion;
pub use mmr::mmr_select;
pub use pipeline::{RetrievalOutcome, RetrievalPipeline, RetrievalRequest};
pub use strategy::{select_strategy, QueryFeatures, Strategy, StrategyParams};
