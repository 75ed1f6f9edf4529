//! Ingestion pipeline (spec §4.3): composes discovery, idempotence,
//! extraction, normalization, summarization, embedding, graph update and
//! upsert into one per-file flow, run over a bounded worker pool.

use crate::config::{IngestConfig, LlmConfig};
use crate::data::Document;
use crate::error::EngineResult;
use crate::graph::GraphStore;
use crate::ingestion::discovery::{discover, DiscoveredFile};
use crate::ingestion::extract::extract;
use crate::ingestion::graph_update;
use crate::ingestion::normalize::normalize;
use crate::ingestion::queue::RetryQueue;
use crate::ingestion::summarize::summarize;
use crate::ports::{Embedder, Extractor, LexicalStore, Llm, RelationalStore, VectorStore};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

/// One file's outcome (spec §4.3 contract `ingest_file`).
#[derive(Debug, Clone)]
pub enum FileStatus {
    Indexed { doc_id: String },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct IngestionProgress {
    pub current_file: String,
    pub position: usize,
    pub total: usize,
    pub stage: &'static str,
    pub status: Option<FileStatus>,
}

#[derive(Debug, Default, Clone)]
pub struct IngestionReport {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct IngestionPipeline {
    vector_store: Arc<dyn VectorStore>,
    lexical_store: Arc<dyn LexicalStore>,
    relational: Arc<dyn RelationalStore>,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn Extractor>,
    llm: Arc<dyn Llm>,
    graph: Arc<GraphStore>,
    retry_queue: Arc<RetryQueue>,
    config: IngestConfig,
    llm_config: LlmConfig,
}

impl IngestionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        lexical_store: Arc<dyn LexicalStore>,
        relational: Arc<dyn RelationalStore>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn Extractor>,
        llm: Arc<dyn Llm>,
        graph: Arc<GraphStore>,
        retry_queue: Arc<RetryQueue>,
        config: IngestConfig,
        llm_config: LlmConfig,
    ) -> Self {
        Self { vector_store, lexical_store, relational, embedder, extractor, llm, graph, retry_queue, config, llm_config }
    }

    /// Walk `root`, processing discovered files with bounded concurrency
    /// and streaming progress on `progress_tx` (spec §4.3 "Concurrency").
    pub async fn ingest(&self, root: &Path, progress_tx: mpsc::Sender<IngestionProgress>) -> IngestionReport {
        let files = discover(root, &self.config);
        let total = files.len();
        let semaphore = Arc::new(Semaphore::new(self.config.workers_extract.max(1)));
        let mut report = IngestionReport::default();

        let mut handles = Vec::with_capacity(files.len());
        for (position, file) in files.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let progress_tx = progress_tx.clone();
            let this = self.clone_refs();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let status = this.ingest_discovered(&file, position, total, &progress_tx).await;
                status
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(FileStatus::Indexed { .. }) => report.success += 1,
                Ok(FileStatus::Skipped { .. }) => report.skipped += 1,
                Ok(FileStatus::Failed { .. }) => report.failed += 1,
                Err(_) => report.failed += 1,
            }
        }
        report
    }

    /// Single-file entrypoint (spec §4.3 contract `ingest_file`).
    pub async fn ingest_file(&self, path: &Path) -> FileStatus {
        let Ok(metadata) = std::fs::metadata(path) else {
            return FileStatus::Failed { error: "path does not exist".to_string() };
        };
        let Some(file_type) = path.extension().and_then(|e| e.to_str()).map(str::to_lowercase) else {
            return FileStatus::Skipped { reason: "no extension".to_string() };
        };
        if !self.config.allowed_extensions.iter().any(|a| a == &file_type) {
            return FileStatus::Skipped { reason: format!("extension {file_type} not allowed") };
        }
        let file = DiscoveredFile { path: path.to_path_buf(), file_type, file_size: metadata.len() };
        self.ingest_discovered(&file, 0, 1, &mpsc::channel(1).0).await
    }

    fn clone_refs(&self) -> Self {
        Self {
            vector_store: self.vector_store.clone(),
            lexical_store: self.lexical_store.clone(),
            relational: self.relational.clone(),
            embedder: self.embedder.clone(),
            extractor: self.extractor.clone(),
            llm: self.llm.clone(),
            graph: self.graph.clone(),
            retry_queue: self.retry_queue.clone(),
            config: self.config.clone(),
            llm_config: self.llm_config.clone(),
        }
    }

    async fn ingest_discovered(
        &self,
        file: &DiscoveredFile,
        position: usize,
        total: usize,
        progress_tx: &mpsc::Sender<IngestionProgress>,
    ) -> FileStatus {
        let path_str = file.path.display().to_string();
        let canonical = std::fs::canonicalize(&file.path).map(|p| p.display().to_string()).unwrap_or_else(|_| path_str.clone());
        let doc_id = Document::id_for_path(&canonical);

        let _ = progress_tx.send(IngestionProgress { current_file: path_str.clone(), position, total, stage: "discover", status: None }).await;

        // Idempotence: skip when the stored entry is at least as fresh as
        // the file's mtime (spec §4.3 stage 2).
        let file_mtime = std::fs::metadata(&file.path).ok().and_then(|m| m.modified().ok()).map(chrono::DateTime::<Utc>::from);
        if let Ok(Some(existing)) = self.relational.get_document(&doc_id).await {
            if let Some(mtime) = file_mtime {
                if existing.updated_at >= mtime {
                    return FileStatus::Skipped { reason: "up to date".to_string() };
                }
            }
        }

        match self.process_file(file, &doc_id, position, total, progress_tx).await {
            Ok(()) => FileStatus::Indexed { doc_id },
            Err(e) => FileStatus::Failed { error: e.to_string() },
        }
    }

    async fn process_file(
        &self,
        file: &DiscoveredFile,
        doc_id: &str,
        position: usize,
        total: usize,
        progress_tx: &mpsc::Sender<IngestionProgress>,
    ) -> EngineResult<()> {
        let path_str = file.path.display().to_string();

        let _ = progress_tx.send(IngestionProgress { current_file: path_str.clone(), position, total, stage: "extract", status: None }).await;
        let extracted = extract(self.extractor.as_ref(), &file.path, &file.file_type).await?;

        let _ = progress_tx.send(IngestionProgress { current_file: path_str.clone(), position, total, stage: "normalize", status: None }).await;
        let normalized = normalize(&extracted.raw_text, self.config.max_content_chars);

        let _ = progress_tx.send(IngestionProgress { current_file: path_str.clone(), position, total, stage: "summarize", status: None }).await;
        let summary = summarize(self.llm.as_ref(), &normalized, &self.llm_config).await;

        let _ = progress_tx.send(IngestionProgress { current_file: path_str.clone(), position, total, stage: "embed", status: None }).await;
        let embedding = self.embedder.embed(&summary.summary).await?;

        let _ = progress_tx.send(IngestionProgress { current_file: path_str.clone(), position, total, stage: "graph_update", status: None }).await;
        let relationships = Vec::new();
        graph_update::apply(&self.graph, doc_id, &summary.entities, &relationships);

        let now = Utc::now();
        let existing = self.relational.get_document(doc_id).await?;
        let created_at = existing.as_ref().map(|d| d.created_at).unwrap_or(now);

        let document = Document {
            id: doc_id.to_string(),
            filename: file.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
            path: path_str.clone(),
            file_type: file.file_type.clone(),
            doc_type: summary.document_type.clone(),
            summary: summary.summary.clone(),
            detailed_summary: normalized.clone(),
            keywords: summary.keywords.clone(),
            entities: summary.entities.iter().cloned().collect(),
            topics: summary.topics.clone(),
            full_content: Document::truncate_content(&normalized),
            embedding,
            created_at,
            updated_at: now,
            file_size: file.file_size,
            page_count: extracted.page_count,
            author: extracted.author,
            partial_index: summary.partial_index,
        };
        document.check_embedding_dim(self.embedder.dim())?;

        let _ = progress_tx.send(IngestionProgress { current_file: path_str.clone(), position, total, stage: "upsert", status: None }).await;
        if self.relational.upsert_document(&document).await.is_err() {
            self.retry_queue.push(document.clone());
        }
        self.vector_store.upsert(&document).await?;
        self.lexical_store.upsert(&document).await?;

        let _ = progress_tx
            .send(IngestionProgress { current_file: path_str, position, total, stage: "complete", status: Some(FileStatus::Indexed { doc_id: doc_id.to_string() }) })
            .await;
        Ok(())
    }

    /// Remove a document: deletes it from every store and drops its
    /// authored `MENTIONS` edges (spec §4.3 "File-watcher integration").
    pub async fn remove_file(&self, doc_id: &str) -> EngineResult<()> {
        self.relational.delete_document(doc_id).await?;
        self.vector_store.delete(doc_id).await?;
        self.lexical_store.delete(doc_id).await?;
        self.graph.remove_document(doc_id);
        Ok(())
    }
}
