//! Episode: a durable record of one query+response (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User feedback on a past episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i8)]
pub enum Feedback {
    Negative = -1,
    Neutral = 0,
    Positive = 1,
}

impl Feedback {
    pub fn from_rating(rating: i8) -> Result<Self, crate::error::EngineError> {
        match rating {
            -1 => Ok(Feedback::Negative),
            0 => Ok(Feedback::Neutral),
            1 => Ok(Feedback::Positive),
            other => Err(crate::error::EngineError::InputInvalid(format!(
                "feedback rating must be in {{-1,0,1}}, got {other}"
            ))),
        }
    }

    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

/// Append-only episodic memory record. `decay_factor` is recomputed
/// periodically by the decay job (spec §4.4) and `confidence` is the
/// confidence assigned to the original response (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub user_id: Option<String>,
    pub query: String,
    pub query_embedding: Vec<f32>,
    pub response: String,
    pub result_ids: Vec<String>,
    pub confidence: f64,
    pub feedback: Feedback,
    pub timestamp: DateTime<Utc>,
    pub access_count: u64,
    pub decay_factor: f64,
}

impl Episode {
    pub fn new(
        id: String,
        user_id: Option<String>,
        query: String,
        query_embedding: Vec<f32>,
        response: String,
        result_ids: Vec<String>,
        confidence: f64,
    ) -> Self {
        Self {
            id,
            user_id,
            query,
            query_embedding,
            response,
            result_ids,
            confidence: confidence.clamp(0.0, 1.0),
            feedback: Feedback::Neutral,
            timestamp: Utc::now(),
            access_count: 0,
            decay_factor: 1.0,
        }
    }
}
