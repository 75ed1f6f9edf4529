//! Session / SessionTurn: short-term conversation state (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTurn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub sources: Option<Vec<String>>,
    pub confidence: Option<f64>,
}

/// Sliding-window conversation state, owned by the KV session port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: Option<String>,
    pub turns: VecDeque<SessionTurn>,
    pub window_size: usize,
    pub last_intent: Option<String>,
    pub last_results: Vec<String>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(id: String, user_id: Option<String>, window_size: usize) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            turns: VecDeque::with_capacity(window_size),
            window_size,
            last_intent: None,
            last_results: Vec::new(),
            last_activity: now,
        }
    }

    /// Append a turn, evicting the oldest if the window is full. Bounds the
    /// stored-turn invariant in spec §8 ("never exceeds the configured
    /// window size").
    pub fn push_turn(&mut self, turn: SessionTurn) {
        if self.turns.len() >= self.window_size {
            self.turns.pop_front();
        }
        self.last_activity = turn.timestamp;
        self.turns.push_back(turn);
    }

    pub fn most_recent_user_query(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::User)
            .map(|t| t.content.as_str())
    }

    pub fn is_expired(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.last_activity > ttl
    }
}
