//! Request/response DTOs for the transport-agnostic RPC surface (spec
//! §6.1): a flat method-per-route set rather than a JSON-RPC 2.0
//! envelope, since there is no MCP client on the other end to speak that
//! protocol to anymore.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use vantage_core::data::{Document, Episode, ScoredDocument};
use vantage_core::ports::FilterValue;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub attached_documents: Vec<String>,
    #[serde(default)]
    pub filters: BTreeMap<String, serde_json::Value>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    10
}

impl SearchRequest {
    /// Scalar-only filter conversion (spec §4.2 "filters are pushed to
    /// the store as boolean constraints"); range filters are expressed
    /// as a `{"min":..,"max":..}` object.
    pub fn filters(&self) -> BTreeMap<String, FilterValue> {
        self.filters
            .iter()
            .map(|(k, v)| {
                let value = match v.as_object() {
                    Some(obj) if obj.contains_key("min") || obj.contains_key("max") => {
                        FilterValue::Range { min: obj.get("min").cloned(), max: obj.get("max").cloned() }
                    }
                    _ => FilterValue::Scalar(v.clone()),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

#[derive(Debug, Serialize, Default)]
pub struct SearchResponse {
    pub response: String,
    pub results: Vec<ScoredDocument>,
    pub confidence: f64,
    pub routing_path: Vec<String>,
    pub total_time_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct IndexDirectoryRequest {
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct IndexDirectoryResponse {
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
pub struct IndexFileRequest {
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct IndexFileResponse {
    pub status: String,
    pub doc_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListDocumentsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListDocumentsResponse {
    pub documents: Vec<Document>,
}

#[derive(Debug, Serialize)]
pub struct GetSessionResponse {
    pub session_id: String,
    pub turns: Vec<vantage_core::data::SessionTurn>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub episode_id: String,
    pub rating: i8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WatcherAddPathRequest {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct WatcherRemovePathRequest {
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct WatcherStatusResponse {
    pub enabled: bool,
    pub watched_paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ports: BTreeMap<String, bool>,
}

#[derive(Debug, Serialize)]
pub struct EpisodeResponse {
    pub episode: Episode,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}
