//! Process-scoped composition root (spec §9 "Global singletons" redesign
//! flag): wires every port and pipeline into one `Services` value
//! constructed once at startup and shared behind `Arc`s, instead of the
//! ad-hoc global statics the flag calls out.

use crate::attachment::AttachmentPipeline;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::graph::GraphStore;
use crate::ingestion::{IngestionPipeline, RetryQueue};
use crate::memory::{episodic::EpisodicCoordinator, procedural::ProceduralCoordinator, session::SessionStore, MemoryCoordinator};
use crate::orchestrator::{Driver, NodeDeps};
use crate::ports::default::{CrossEncoderReranker, FastEmbedEmbedder, Fts5LexicalStore, HnswVectorStore, InMemoryKvStore, LocalExtractor, SqliteStore};
use crate::ports::{Embedder, Extractor, KvStore, LexicalStore, Llm, RelationalStore, Reranker, VectorStore};
use crate::retrieval::pipeline::RetrievalPipeline;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Every wired capability and pipeline, shared read-only across requests
/// (spec §3 ownership rule: only [`crate::data::WorkflowState`] is
/// exclusively owned per-request).
pub struct Services {
    pub config: EngineConfig,
    pub vector_store: Arc<dyn VectorStore>,
    pub lexical_store: Arc<dyn LexicalStore>,
    pub relational: Arc<dyn RelationalStore>,
    pub kv: Arc<dyn KvStore>,
    pub embedder: Arc<dyn Embedder>,
    pub reranker: Option<Arc<dyn Reranker>>,
    pub extractor: Arc<dyn Extractor>,
    pub llm: Arc<dyn Llm>,
    pub graph: Arc<GraphStore>,
    pub memory: Arc<MemoryCoordinator>,
    pub retrieval: Arc<RetrievalPipeline>,
    pub attachment: Arc<AttachmentPipeline>,
    pub ingestion: Arc<IngestionPipeline>,
    pub driver: Arc<Driver>,
}

impl Services {
    /// Build the default port set (SQLite relational+FTS5 lexical, HNSW
    /// vector, fastembed embedder, cross-encoder reranker, local
    /// extraction) backed by `data_dir`. `llm` is always injected: the LLM
    /// inference endpoint is an external capability with no bundled
    /// default (spec §1).
    pub fn bootstrap(config: EngineConfig, data_dir: &Path, llm: Arc<dyn Llm>) -> EngineResult<Self> {
        let relational = Arc::new(SqliteStore::open(&data_dir.join("vantage.db"))?);
        let relational: Arc<dyn RelationalStore> = relational;

        let lexical_store: Arc<dyn LexicalStore> = {
            let sqlite = Arc::new(SqliteStore::open(&data_dir.join("vantage.db"))?);
            Arc::new(Fts5LexicalStore::new(sqlite))
        };

        let vector_store: Arc<dyn VectorStore> = Arc::new(
            HnswVectorStore::new(config.vector.dim, config.vector.index_m, config.vector.ef_construction, config.vector.ef_search)
                .map_err(EngineError::from)?,
        );

        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let embedder: Arc<dyn Embedder> = Arc::new(FastEmbedEmbedder::new(config.vector.dim));
        let reranker: Option<Arc<dyn Reranker>> = if config.search.rerank_enabled { Some(Arc::new(CrossEncoderReranker::new())) } else { None };
        let extractor: Arc<dyn Extractor> = Arc::new(LocalExtractor::new(Some(llm.clone()), config.ingest.ocr_min_chars_threshold));
        let graph = Arc::new(GraphStore::new());

        Ok(Self::wire(config, vector_store, lexical_store, relational, kv, embedder, reranker, extractor, llm, graph))
    }

    /// Compose already-constructed ports (used by tests and by callers
    /// supplying alternate port backends) into the pipeline layer.
    #[allow(clippy::too_many_arguments)]
    pub fn wire(
        config: EngineConfig,
        vector_store: Arc<dyn VectorStore>,
        lexical_store: Arc<dyn LexicalStore>,
        relational: Arc<dyn RelationalStore>,
        kv: Arc<dyn KvStore>,
        embedder: Arc<dyn Embedder>,
        reranker: Option<Arc<dyn Reranker>>,
        extractor: Arc<dyn Extractor>,
        llm: Arc<dyn Llm>,
        graph: Arc<GraphStore>,
    ) -> Self {
        let session = SessionStore::new(kv.clone(), config.memory.session_window_size, Duration::from_secs(config.memory.session_ttl_seconds));
        let episodic = EpisodicCoordinator::new(relational.clone(), config.memory.episodic_top_k, config.memory.episodic_min_score, config.memory.episodic_prune_threshold, 20);
        let procedural = ProceduralCoordinator::new(relational.clone(), config.memory.procedural_min_confidence, config.memory.procedural_min_samples);
        let memory = Arc::new(MemoryCoordinator::new(session, episodic, procedural, relational.clone()));

        let retrieval = Arc::new(RetrievalPipeline::new(
            vector_store.clone(),
            lexical_store.clone(),
            embedder.clone(),
            reranker.clone(),
            relational.clone(),
            Some(graph.clone()),
            config.search.clone(),
        ));

        let attachment = Arc::new(AttachmentPipeline::new(
            relational.clone(),
            extractor.clone(),
            llm.clone(),
            Duration::from_secs(config.ingest.attachment_cache_ttl_seconds),
        ));

        let ingestion = Arc::new(IngestionPipeline::new(
            vector_store.clone(),
            lexical_store.clone(),
            relational.clone(),
            embedder.clone(),
            extractor.clone(),
            llm.clone(),
            graph.clone(),
            Arc::new(RetryQueue::new()),
            config.ingest.clone(),
            config.llm.clone(),
        ));

        let node_deps = Arc::new(NodeDeps {
            memory: memory.clone(),
            retrieval: retrieval.clone(),
            attachment: attachment.clone(),
            llm: llm.clone(),
            embedder: embedder.clone(),
            graph: graph.clone(),
            search_config: config.search.clone(),
            workflow_config: config.workflow.clone(),
        });
        let driver = Arc::new(Driver::new(node_deps, config.workflow.clone()));

        Self { config, vector_store, lexical_store, relational, kv, embedder, reranker, extractor, llm, graph, memory, retrieval, attachment, ingestion, driver }
    }
}
