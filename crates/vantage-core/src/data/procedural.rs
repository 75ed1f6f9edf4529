//! ProceduralPattern: a learned (user, context) → preference mapping (spec §3).

use serde::{Deserialize, Serialize};

/// A learned preference keyed by `(user_id, pattern_type, data_key)` at the
/// coordinator level; this struct is the stored counter+payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProceduralPattern {
    pub id: String,
    pub user_id: Option<String>,
    pub pattern_type: String,
    pub data_key: String,
    pub data: serde_json::Value,
    pub success_count: u64,
    pub failure_count: u64,
}

impl ProceduralPattern {
    pub fn new(id: String, user_id: Option<String>, pattern_type: String, data_key: String, data: serde_json::Value) -> Self {
        Self { id, user_id, pattern_type, data_key, data, success_count: 0, failure_count: 0 }
    }

    /// `confidence = success/(success+failure)`; 0.0 when never observed.
    pub fn confidence(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            0.0
        } else {
            self.success_count as f64 / total as f64
        }
    }

    pub fn sample_size(&self) -> u64 {
        self.success_count + self.failure_count
    }

    pub fn record(&mut self, succeeded: bool) {
        if succeeded {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
    }

    /// Prune when confidence < 0.3 and the sample size is large enough to
    /// trust the estimate (spec §3).
    pub fn should_prune(&self, min_sample_size: u64) -> bool {
        self.sample_size() >= min_sample_size && self.confidence() < 0.3
    }

    /// Applicable only when confidence ≥ threshold and sample size ≥
    /// minimum (spec §4.4).
    pub fn is_applicable(&self, min_confidence: f64, min_sample_size: u64) -> bool {
        self.sample_size() >= min_sample_size && self.confidence() >= min_confidence
    }
}
