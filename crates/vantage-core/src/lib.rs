//! # Vantage Core
//!
//! Query processing engine for a local-first semantic document search and
//! retrieval-augmented answering system.
//!
//! - **Hybrid retrieval**: HNSW vector search fused with FTS5 lexical
//!   search via Reciprocal Rank Fusion, optional entity-graph
//!   augmentation, cross-encoder reranking, and MMR diversification
//!   ([`retrieval`]).
//! - **Ingestion**: directory discovery, idempotent per-file extraction,
//!   normalization, summarization, embedding, and graph-entity update,
//!   over a bounded worker pool, plus a debounced filesystem watcher
//!   ([`ingestion`]).
//! - **Orchestration**: a node-based workflow that classifies a query,
//!   optionally decomposes it into sub-queries, routes it to retrieval,
//!   direct answering, clarification, or document-attachment handling,
//!   and streams progress events ([`orchestrator`]).
//! - **Memory**: session, episodic, and procedural tiers composed into
//!   per-query context loading and per-response persistence ([`memory`]).
//! - **Entity graph**: arena-backed store with bounded-BFS expansion used
//!   for graph-augmented retrieval and contextual explanation ([`graph`]).
//! - **Capability and storage ports**: every external collaborator
//!   (vector store, lexical store, relational store, session KV, LLM,
//!   embedder, reranker, extractor) is an `async_trait` interface with a
//!   default local implementation under [`ports::default`].
//!
//! [`services::Services`] is the process-scoped composition root that
//! wires ports into pipelines once at startup.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod attachment;
pub mod config;
pub mod confidence;
pub mod data;
pub mod error;
pub mod graph;
pub mod ingestion;
pub mod memory;
pub mod orchestrator;
pub mod ports;
pub mod retrieval;
pub mod services;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use orchestrator::{Driver, Event, FinalResult, Request};
pub use services::Services;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
