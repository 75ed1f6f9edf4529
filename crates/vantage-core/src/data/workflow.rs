//! WorkflowState: in-memory per-request value carried through orchestrator nodes (spec §3, §4.1).

use super::document::ScoredDocument;
use super::session::Session;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    DocumentSearch,
    GeneralKnowledge,
    SystemMeta,
    Comparison,
    Summarization,
    Analysis,
    ClarificationNeeded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphContext {
    pub nodes: Vec<(String, String, String)>, // (id, name, type)
    pub links: Vec<(String, String, String)>, // (source, target, type)
    pub related_document_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub preferred_strategy: Option<String>,
    pub should_rerank: bool,
    pub topic_weights: BTreeMap<String, f64>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self { preferred_strategy: None, should_rerank: true, topic_weights: BTreeMap::new() }
    }
}

/// One step recorded for the final `steps[]` report and for streaming
/// `step` events (spec §4.1, §6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub stage: String,
    pub action: String,
    pub details: Option<String>,
    pub ts: chrono::DateTime<chrono::Utc>,
}

/// Exclusively owned by the active request; never shared across requests
/// (spec §3 ownership rule).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub request_id: String,
    pub query: String,
    pub intent: Option<Intent>,
    pub classification_confidence: f64,
    pub extracted_filters: BTreeMap<String, serde_json::Value>,
    pub extracted_entities: Vec<String>,
    pub attached_documents: Vec<String>,
    pub session_context: Option<Session>,
    pub user_preferences: Option<UserPreferences>,
    pub search_results: Vec<ScoredDocument>,
    pub graph_context: Option<GraphContext>,
    pub response: String,
    pub confidence: f64,
    pub error: Option<String>,
    pub steps: Vec<StepRecord>,
    pub routing_path: Vec<String>,
    pub degraded: Vec<String>,
}

impl WorkflowState {
    pub fn new(request_id: String, query: String) -> Self {
        Self {
            request_id,
            query,
            intent: None,
            classification_confidence: 0.0,
            extracted_filters: BTreeMap::new(),
            extracted_entities: Vec::new(),
            attached_documents: Vec::new(),
            session_context: None,
            user_preferences: None,
            search_results: Vec::new(),
            graph_context: None,
            response: String::new(),
            confidence: 0.0,
            error: None,
            steps: Vec::new(),
            routing_path: Vec::new(),
            degraded: Vec::new(),
        }
    }

    pub fn record_step(&mut self, stage: &str, action: &str, details: Option<String>) {
        self.steps.push(StepRecord {
            stage: stage.to_string(),
            action: action.to_string(),
            details,
            ts: chrono::Utc::now(),
        });
        self.routing_path.push(stage.to_string());
    }

    pub fn mark_degraded(&mut self, reason: &str) {
        self.degraded.push(reason.to_string());
    }
}
