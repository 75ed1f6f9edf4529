//! Multi-path watcher management backing the `Watcher.*` RPC surface
//! (spec §6.1). `vantage_core::ingestion::FileWatcher` only watches one
//! root for the lifetime of the value it returns; this composes one
//! `FileWatcher` + forwarding task per enabled root over the shared
//! `IngestionPipeline`, the way the teacher's dashboard spawns one
//! background task per long-lived subscription.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vantage_core::ingestion::{FileWatcher, IngestionPipeline, WatchEvent};
use vantage_core::EngineConfig;

struct WatchedRoot {
    handle: JoinHandle<()>,
}

/// Tracks which roots are being watched and lets callers add, remove,
/// enable or disable them independently of process lifetime.
pub struct WatchManager {
    config: EngineConfig,
    ingestion: Arc<IngestionPipeline>,
    roots: Mutex<HashMap<PathBuf, WatchedRoot>>,
    enabled: std::sync::atomic::AtomicBool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct WatchStatus {
    pub enabled: bool,
    pub watched_paths: Vec<PathBuf>,
}

impl WatchManager {
    pub fn new(config: EngineConfig, ingestion: Arc<IngestionPipeline>) -> Self {
        Self { config, ingestion, roots: Mutex::new(HashMap::new()), enabled: std::sync::atomic::AtomicBool::new(false) }
    }

    pub async fn status(&self) -> WatchStatus {
        let roots = self.roots.lock().await;
        WatchStatus { enabled: self.is_enabled(), watched_paths: roots.keys().cloned().collect() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Turns watching on for every currently tracked path without
    /// re-adding paths that are already running.
    pub fn enable(&self) {
        self.enabled.store(true, std::sync::atomic::Ordering::Relaxed);
    }

    /// Stops every running watch task; tracked paths are forgotten so a
    /// later `enable` requires re-adding them, mirroring the spec's
    /// `Disable` as a full stop rather than a pause.
    pub async fn disable(&self) {
        self.enabled.store(false, std::sync::atomic::Ordering::Relaxed);
        let mut roots = self.roots.lock().await;
        for (path, watched) in roots.drain() {
            watched.handle.abort();
            info!(?path, "stopped watching");
        }
    }

    pub async fn add_path(&self, root: PathBuf) -> Result<(), vantage_core::EngineError> {
        let mut roots = self.roots.lock().await;
        if roots.contains_key(&root) {
            return Ok(());
        }
        let handle = self.spawn_watch(root.clone())?;
        roots.insert(root, WatchedRoot { handle });
        self.enabled.store(true, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }

    pub async fn remove_path(&self, root: &Path) -> bool {
        let mut roots = self.roots.lock().await;
        if let Some(watched) = roots.remove(root) {
            watched.handle.abort();
            true
        } else {
            false
        }
    }

    fn spawn_watch(&self, root: PathBuf) -> Result<JoinHandle<()>, vantage_core::EngineError> {
        let mut watcher = FileWatcher::watch(&root, &self.config.watcher)
            .map_err(|e| vantage_core::EngineError::Unavailable(format!("failed to watch {}: {e}", root.display())))?;
        let ingestion = self.ingestion.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = watcher.events.recv().await {
                handle_event(&ingestion, event).await;
            }
        });
        Ok(handle)
    }
}

async fn handle_event(ingestion: &Arc<IngestionPipeline>, event: WatchEvent) {
    match event {
        WatchEvent::Created(path) | WatchEvent::Modified(path) => {
            let status = ingestion.ingest_file(&path).await;
            info!(?path, ?status, "watcher re-indexed file");
        }
        WatchEvent::Removed(path) => {
            let doc_id = vantage_core::data::Document::id_for_path(&path.to_string_lossy());
            if let Err(e) = ingestion.remove_file(&doc_id).await {
                warn!(?path, error = %e, "watcher failed to remove document");
            }
        }
        WatchEvent::Moved { from, to } => {
            let from_id = vantage_core::data::Document::id_for_path(&from.to_string_lossy());
            if let Err(e) = ingestion.remove_file(&from_id).await {
                warn!(path = ?from, error = %e, "watcher failed to remove moved-from document");
            }
            let status = ingestion.ingest_file(&to).await;
            info!(path = ?to, ?status, "watcher re-indexed moved file");
        }
    }
}
