//! Episodic tier of the memory coordinator (spec §4.4): cosine-similarity
//! recall adjusted by time decay and feedback, plus the periodic decay/prune
//! job.
//!
//! The decay formula is given explicitly and unambiguously in spec §4.4
//! (`decay = 1/(1 + days_since_created/365)`); it is used verbatim here
//! rather than the teacher's FSRS-6 power-law curve
//! (`consolidation::sleep::SleepConsolidation::calculate_decay`), which
//! models a different quantity (see DESIGN.md for why the supplement in
//! §12 does not override an explicit spec §4.4 formula).

use crate::data::{Episode, Feedback};
use crate::ports::RelationalStore;
use std::sync::Arc;

pub const DECAY_HALF_LIFE_DAYS: f64 = 365.0;

pub fn feedback_multiplier(feedback: Feedback) -> f64 {
    match feedback {
        Feedback::Positive => 1.2,
        Feedback::Negative => 0.5,
        Feedback::Neutral => 1.0,
    }
}

pub fn decay_factor(days_since_created: f64) -> f64 {
    1.0 / (1.0 + days_since_created.max(0.0) / DECAY_HALF_LIFE_DAYS)
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)) as f64
    }
}

/// `adjusted_score = cosine · decay · feedback_mult` (spec §4.4).
pub fn adjusted_score(episode: &Episode, query_embedding: &[f32], now: chrono::DateTime<chrono::Utc>) -> f64 {
    let cosine = cosine_similarity(&episode.query_embedding, query_embedding);
    let days = (now - episode.timestamp).num_seconds() as f64 / 86_400.0;
    cosine * decay_factor(days) * feedback_multiplier(episode.feedback)
}

pub struct EpisodicCoordinator {
    relational: Arc<dyn RelationalStore>,
    top_k: usize,
    min_score: f64,
    prune_threshold: f64,
    prune_floor_per_user: usize,
}

impl EpisodicCoordinator {
    pub fn new(relational: Arc<dyn RelationalStore>, top_k: usize, min_score: f64, prune_threshold: f64, prune_floor_per_user: usize) -> Self {
        Self { relational, top_k, min_score, prune_threshold, prune_floor_per_user }
    }

    /// Top K episodes by adjusted similarity above `min_score` (spec §4.4).
    pub async fn recall(&self, user_id: Option<&str>, query_embedding: &[f32]) -> Result<Vec<Episode>, crate::error::EngineError> {
        let now = chrono::Utc::now();
        let mut episodes = self.relational.episodes_for_user(user_id).await?;
        let mut scored: Vec<(f64, Episode)> = episodes
            .drain(..)
            .map(|e| (adjusted_score(&e, query_embedding, now), e))
            .filter(|(score, _)| *score >= self.min_score)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(self.top_k).map(|(_, e)| e).collect())
    }

    pub async fn record(&self, episode: &Episode) -> Result<(), crate::error::EngineError> {
        self.relational.insert_episode(episode).await?;
        Ok(())
    }

    /// Update an episode's feedback and recompute its decay factor
    /// in-place; applying the same value twice is a no-op on access_count
    /// beyond the first increment (spec §8 round-trip law).
    pub async fn apply_feedback(&self, episode_id: &str, rating: i8) -> Result<(), crate::error::EngineError> {
        let feedback = Feedback::from_rating(rating)?;
        let mut episode = self
            .relational
            .get_episode(episode_id)
            .await?
            .ok_or_else(|| crate::error::EngineError::NotFound(format!("episode {episode_id}")))?;
        if episode.feedback == feedback {
            return Ok(());
        }
        episode.feedback = feedback;
        episode.access_count += 1;
        let now = chrono::Utc::now();
        let days = (now - episode.timestamp).num_seconds() as f64 / 86_400.0;
        episode.decay_factor = decay_factor(days);
        self.relational.update_episode(&episode).await?;
        Ok(())
    }

    /// Periodic (daily) decay/prune pass (spec §4.4): recompute decay,
    /// then drop episodes whose adjusted score (against their own
    /// embedding, i.e. pure decay·feedback with cosine=1) falls below
    /// `prune_threshold` and `access_count < 2`, preserving a floor of the
    /// most recent `prune_floor_per_user` episodes.
    pub async fn run_decay_job(&self, user_id: Option<&str>) -> Result<usize, crate::error::EngineError> {
        let now = chrono::Utc::now();
        let mut episodes = self.relational.episodes_for_user(user_id).await?;
        episodes.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut pruned = 0;
        for (rank, episode) in episodes.iter().enumerate() {
            let days = (now - episode.timestamp).num_seconds() as f64 / 86_400.0;
            let decay = decay_factor(days);
            let score = decay * feedback_multiplier(episode.feedback);
            let within_floor = rank < self.prune_floor_per_user;
            if !within_floor && score < self.prune_threshold && episode.access_count < 2 {
                self.relational.delete_episode(&episode.id).await?;
                pruned += 1;
            }
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_factor_at_zero_days_is_one() {
        assert!((decay_factor(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn decay_factor_at_one_half_life_is_one_half() {
        assert!((decay_factor(DECAY_HALF_LIFE_DAYS) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn feedback_multiplier_matches_spec_table() {
        assert_eq!(feedback_multiplier(Feedback::Positive), 1.2);
        assert_eq!(feedback_multiplier(Feedback::Negative), 0.5);
        assert_eq!(feedback_multiplier(Feedback::Neutral), 1.0);
    }

    #[test]
    fn adjusted_score_zero_for_orthogonal_embeddings() {
        let mut episode = Episode::new("e1".into(), None, "q".into(), vec![1.0, 0.0], "r".into(), vec![], 0.8);
        episode.timestamp = chrono::Utc::now();
        let score = adjusted_score(&episode, &[0.0, 1.0], chrono::Utc::now());
        assert!(score.abs() < 1e-9);
    }
}
