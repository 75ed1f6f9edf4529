//! Orchestrator event stream (spec §4.1, §6.2): one enum broadcast over a
//! per-request channel, internally tagged the same way the teacher's
//! dashboard event bus shapes `VestigeEvent` for WebSocket transmission.

use crate::data::{GraphContext, Intent, ScoredDocument};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    Step {
        stage: String,
        action: String,
        details: Option<String>,
    },
    PartialResults {
        docs: Vec<ScoredDocument>,
    },
    AnswerChunk {
        text: String,
    },
    Confidence {
        score: f64,
    },
    Graph {
        nodes: Vec<(String, String, String)>,
        links: Vec<(String, String, String)>,
    },
    Error {
        kind: String,
        message: String,
    },
    Complete {
        final_result: FinalResult,
    },
}

/// `finalResult` (spec §4.1 contract).
#[derive(Debug, Clone, Serialize, Default)]
pub struct FinalResult {
    pub response: String,
    pub results: Vec<ScoredDocument>,
    pub confidence: f64,
    pub steps: Vec<crate::data::StepRecord>,
    pub routing_path: Vec<String>,
    pub intent: Option<Intent>,
    pub search_time_ms: u64,
    pub total_time_ms: u64,
    pub suggested_followups: Option<Vec<String>>,
    pub graph_context: Option<GraphContext>,
}

impl Event {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
