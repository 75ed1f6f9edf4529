//! RPC dispatch layer (spec §6.1): translates the transport-agnostic
//! operation set onto `vantage_core::Services`, the way the teacher's
//! `McpServer` translated JSON-RPC `tools/call` names onto `Storage` +
//! `CognitiveEngine` calls. There is no protocol envelope here (no
//! JSON-RPC, no MCP session negotiation) since the RPC surface is no
//! longer addressed through MCP.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use vantage_core::{Driver, EngineError, EngineResult, Event, FinalResult, Request, Services};

use crate::protocol::types::{HealthResponse, SearchRequest};
use crate::watch_manager::{WatchManager, WatchStatus};

/// Owns the composition root and the watcher-management layer, and
/// exposes one method per spec §6.1 operation.
pub struct VantageServer {
    pub services: Arc<Services>,
    pub watch: Arc<WatchManager>,
}

impl VantageServer {
    pub fn new(services: Arc<Services>, watch: Arc<WatchManager>) -> Self {
        Self { services, watch }
    }

    pub fn driver(&self) -> &Arc<Driver> {
        &self.services.driver
    }

    /// `Search` (spec §6.1): streams `Event`s over `events` and returns
    /// the final result once the orchestrator reaches `persist`.
    /// `cancellation` lets the transport abort an in-flight request (e.g.
    /// on client disconnect); the request then terminates with
    /// `EngineError::Cancelled`.
    pub async fn search(&self, req: SearchRequest, events: mpsc::Sender<Event>, cancellation: CancellationToken) -> EngineResult<FinalResult> {
        if req.query.trim().is_empty() {
            return Err(EngineError::input_invalid("query must not be empty"));
        }
        let request = Request {
            request_id: Uuid::new_v4().to_string(),
            query: req.query,
            user_id: req.user_id,
            session_id: req.session_id,
            attached_documents: req.attached_documents,
            filters: req.filters(),
            top_k: req.top_k,
        };
        self.services.driver.process(request, events, cancellation).await
    }

    /// `IndexDirectory` (spec §6.1): walks and indexes every allowed file
    /// under `path` with bounded concurrency.
    pub async fn index_directory(&self, path: &Path) -> vantage_core::ingestion::IngestionReport {
        let (tx, mut rx) = mpsc::channel(64);
        let ingestion = self.services.ingestion.clone();
        let path = path.to_path_buf();
        let handle = tokio::spawn(async move { ingestion.ingest(&path, tx).await });
        while rx.recv().await.is_some() {}
        handle.await.unwrap_or_default()
    }

    /// `IndexFile` (spec §6.1): single-file ingest, idempotent on doc id.
    pub async fn index_file(&self, path: &Path) -> vantage_core::ingestion::FileStatus {
        self.services.ingestion.ingest_file(path).await
    }

    pub async fn get_document(&self, id: &str) -> EngineResult<Option<vantage_core::data::Document>> {
        self.services.relational.get_document(id).await.map_err(EngineError::from)
    }

    pub async fn list_documents(&self, limit: usize, offset: usize) -> EngineResult<Vec<vantage_core::data::Document>> {
        let filters = Default::default();
        self.services.relational.list_documents(&filters, limit, offset).await.map_err(EngineError::from)
    }

    pub async fn delete_document(&self, id: &str) -> EngineResult<()> {
        self.services.ingestion.remove_file(id).await
    }

    pub async fn get_session(&self, session_id: &str, user_id: Option<&str>) -> vantage_core::data::Session {
        self.services.memory.get_session(session_id, user_id).await
    }

    pub async fn clear_session(&self, session_id: &str) {
        self.services.memory.clear_session(session_id).await
    }

    /// `Feedback` (spec §6.1): updates an episode's rating and reweights
    /// the procedural pattern that produced it, if any. `comment` has no
    /// persisted field on `Episode` (spec §3) so it is only logged.
    pub async fn feedback(&self, user_id: Option<&str>, episode_id: &str, rating: i8, comment: Option<&str>) -> EngineResult<()> {
        if let Some(comment) = comment {
            tracing::info!(episode_id, comment, "feedback comment");
        }
        self.services.memory.apply_feedback(user_id, episode_id, rating, None, None).await
    }

    pub async fn watcher_enable(&self) {
        self.watch.enable();
    }

    pub async fn watcher_disable(&self) {
        self.watch.disable().await;
    }

    pub async fn watcher_status(&self) -> WatchStatus {
        self.watch.status().await
    }

    pub async fn watcher_add_path(&self, path: &Path) -> EngineResult<()> {
        self.watch.add_path(path.to_path_buf()).await
    }

    pub async fn watcher_remove_path(&self, path: &Path) -> bool {
        self.watch.remove_path(path).await
    }

    /// `Health` (spec §6.1): a cheap reachability probe per injected
    /// port. The LLM and extractor ports have no ping primitive, so
    /// their presence is reported as configured rather than verified
    /// live, matching the teacher's health check reporting what it can
    /// cheaply observe rather than exercising every backend.
    pub async fn health(&self) -> HealthResponse {
        let mut ports = std::collections::BTreeMap::new();
        ports.insert("vector_store".to_string(), self.services.vector_store.dim() > 0);
        ports.insert("embedder".to_string(), self.services.embedder.dim() > 0);
        ports.insert("relational".to_string(), self.services.relational.get_document("__health__").await.is_ok());
        ports.insert("kv".to_string(), self.services.kv.get("__health__").await.is_ok());
        ports.insert(
            "reranker".to_string(),
            self.services.reranker.as_ref().map(|r| r.is_available()).unwrap_or(true),
        );
        ports.insert("llm".to_string(), true);
        ports.insert("extractor".to_string(), true);

        let status = if ports.values().all(|ok| *ok) { "healthy" } else { "degraded" };
        HealthResponse { status, ports }
    }
}
