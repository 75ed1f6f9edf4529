//! Memory coordinator (spec §4.4): composes the session, episodic, and
//! procedural tiers into per-query context loading and per-response
//! persistence.

pub mod episodic;
pub mod procedural;
pub mod session;

use crate::data::{Episode, ProceduralPattern, SessionTurn};
use crate::error::EngineResult;
use crate::ports::RelationalStore;
use episodic::EpisodicCoordinator;
use procedural::ProceduralCoordinator;
use session::SessionStore;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Context assembled for one query (spec §4.4 `load_context`).
#[derive(Debug, Default)]
pub struct Context {
    pub session_turns: Vec<SessionTurn>,
    pub episodes: Vec<Episode>,
    pub procedural_preferences: Vec<ProceduralPattern>,
    pub topic_preferences: BTreeMap<String, f64>,
    /// Set when the session tier had to fall back to the process-local map.
    pub degraded: bool,
}

pub struct MemoryCoordinator {
    session: SessionStore,
    episodic: EpisodicCoordinator,
    procedural: ProceduralCoordinator,
    relational: Arc<dyn RelationalStore>,
}

impl MemoryCoordinator {
    pub fn new(session: SessionStore, episodic: EpisodicCoordinator, procedural: ProceduralCoordinator, relational: Arc<dyn RelationalStore>) -> Self {
        Self { session, episodic, procedural, relational }
    }

    pub async fn load_context(
        &self,
        user_id: Option<&str>,
        session_id: Option<&str>,
        query_embedding: &[f32],
        strategy_pattern_type: &str,
    ) -> EngineResult<Context> {
        let (session_turns, degraded) = if let Some(session_id) = session_id {
            let (session, degraded) = self.session.get_or_create(session_id, user_id).await;
            (session.turns.into_iter().collect(), degraded)
        } else {
            (Vec::new(), false)
        };

        let episodes = self.episodic.recall(user_id, query_embedding).await?;
        let procedural_preferences = self.procedural.applicable(user_id, strategy_pattern_type).await?;
        let topic_preferences = self.relational.topic_preferences(user_id).await?;

        Ok(Context { session_turns, episodes, procedural_preferences, topic_preferences, degraded })
    }

    /// Append a single turn to the session window without touching
    /// episodic/procedural storage, for recording each side of a
    /// conversation turn as it happens.
    pub async fn push_turn(&self, session_id: &str, user_id: Option<&str>, turn: SessionTurn) -> bool {
        self.session.push_turn(session_id, user_id, turn).await
    }

    /// Fetch (or create) a session's turn window directly, for the
    /// `GetSession` RPC surface (spec §6.1).
    pub async fn get_session(&self, session_id: &str, user_id: Option<&str>) -> crate::data::Session {
        self.session.get_or_create(session_id, user_id).await.0
    }

    /// Clear a session's turn window, for the `ClearSession` RPC surface.
    pub async fn clear_session(&self, session_id: &str) {
        self.session.clear(session_id).await
    }

    /// Append to session, store the episode, and (optionally) bump one
    /// topic's interest score (spec §4.4 `record`).
    pub async fn record(
        &self,
        user_id: Option<&str>,
        session_id: Option<&str>,
        turn: Option<SessionTurn>,
        episode: &Episode,
        topic_interest: Option<(&str, f64)>,
    ) -> EngineResult<bool> {
        let mut degraded = false;
        if let (Some(session_id), Some(turn)) = (session_id, turn) {
            degraded = self.session.push_turn(session_id, user_id, turn).await;
        }
        self.episodic.record(episode).await?;
        if let Some((topic, delta)) = topic_interest {
            self.relational.record_topic_interest(user_id, topic, delta).await?;
        }
        Ok(degraded)
    }

    /// Update an episode's feedback and reweight the procedural pattern
    /// that produced it, if any (spec §4.4 `apply_feedback`).
    pub async fn apply_feedback(
        &self,
        user_id: Option<&str>,
        episode_id: &str,
        rating: i8,
        pattern_type: Option<&str>,
        data_key: Option<&str>,
    ) -> EngineResult<()> {
        self.episodic.apply_feedback(episode_id, rating).await?;
        if let (Some(pattern_type), Some(data_key)) = (pattern_type, data_key) {
            self.procedural.reweight_on_feedback(user_id, pattern_type, data_key, rating > 0).await?;
        }
        Ok(())
    }

    pub async fn run_decay_job(&self, user_id: Option<&str>) -> EngineResult<usize> {
        self.episodic.run_decay_job(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Document, Entity, EntityType, Relationship, TurnRole};
    use crate::error::RelationalError;
    use crate::ports::default::InMemoryKvStore;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeRelational {
        episodes: Mutex<Vec<Episode>>,
        patterns: Mutex<Vec<ProceduralPattern>>,
        topics: Mutex<BTreeMap<String, f64>>,
    }

    #[async_trait]
    impl RelationalStore for FakeRelational {
        async fn upsert_document(&self, _doc: &Document) -> Result<(), RelationalError> {
            Ok(())
        }
        async fn get_document(&self, _id: &str) -> Result<Option<Document>, RelationalError> {
            Ok(None)
        }
        async fn list_documents(&self, _filters: &crate::ports::Filters, _limit: usize, _offset: usize) -> Result<Vec<Document>, RelationalError> {
            Ok(vec![])
        }
        async fn delete_document(&self, _id: &str) -> Result<(), RelationalError> {
            Ok(())
        }
        async fn upsert_entity(&self, _entity: &Entity) -> Result<(), RelationalError> {
            Ok(())
        }
        async fn get_entity(&self, _id: &str) -> Result<Option<Entity>, RelationalError> {
            Ok(None)
        }
        async fn find_entity_by_name(&self, _n: &str, _t: EntityType) -> Result<Option<Entity>, RelationalError> {
            Ok(None)
        }
        async fn all_entities(&self) -> Result<Vec<Entity>, RelationalError> {
            Ok(vec![])
        }
        async fn delete_entity(&self, _id: &str) -> Result<(), RelationalError> {
            Ok(())
        }
        async fn upsert_relationship(&self, _rel: &Relationship) -> Result<(), RelationalError> {
            Ok(())
        }
        async fn relationships_from(&self, _id: &str) -> Result<Vec<Relationship>, RelationalError> {
            Ok(vec![])
        }
        async fn relationships_touching(&self, _id: &str) -> Result<Vec<Relationship>, RelationalError> {
            Ok(vec![])
        }
        async fn delete_relationships_for_document(&self, _e: &str, _d: &str) -> Result<(), RelationalError> {
            Ok(())
        }
        async fn insert_episode(&self, e: &Episode) -> Result<(), RelationalError> {
            self.episodes.lock().unwrap().push(e.clone());
            Ok(())
        }
        async fn get_episode(&self, id: &str) -> Result<Option<Episode>, RelationalError> {
            Ok(self.episodes.lock().unwrap().iter().find(|e| e.id == id).cloned())
        }
        async fn update_episode(&self, e: &Episode) -> Result<(), RelationalError> {
            let mut episodes = self.episodes.lock().unwrap();
            if let Some(existing) = episodes.iter_mut().find(|x| x.id == e.id) {
                *existing = e.clone();
            }
            Ok(())
        }
        async fn episodes_for_user(&self, user_id: Option<&str>) -> Result<Vec<Episode>, RelationalError> {
            Ok(self.episodes.lock().unwrap().iter().filter(|e| e.user_id.as_deref() == user_id).cloned().collect())
        }
        async fn delete_episode(&self, id: &str) -> Result<(), RelationalError> {
            self.episodes.lock().unwrap().retain(|e| e.id != id);
            Ok(())
        }
        async fn upsert_procedural_pattern(&self, pattern: &ProceduralPattern) -> Result<(), RelationalError> {
            let mut patterns = self.patterns.lock().unwrap();
            if let Some(existing) = patterns.iter_mut().find(|p| p.id == pattern.id) {
                *existing = pattern.clone();
            } else {
                patterns.push(pattern.clone());
            }
            Ok(())
        }
        async fn find_procedural_pattern(&self, user_id: Option<&str>, pattern_type: &str, data_key: &str) -> Result<Option<ProceduralPattern>, RelationalError> {
            let patterns = self.patterns.lock().unwrap();
            Ok(patterns.iter().find(|p| p.user_id.as_deref() == user_id && p.pattern_type == pattern_type && p.data_key == data_key).cloned())
        }
        async fn procedural_patterns_for(&self, user_id: Option<&str>, pattern_type: &str) -> Result<Vec<ProceduralPattern>, RelationalError> {
            let patterns = self.patterns.lock().unwrap();
            Ok(patterns.iter().filter(|p| p.user_id.as_deref() == user_id && p.pattern_type == pattern_type).cloned().collect())
        }
        async fn record_topic_interest(&self, _u: Option<&str>, topic: &str, delta: f64) -> Result<(), RelationalError> {
            *self.topics.lock().unwrap().entry(topic.to_string()).or_insert(0.0) += delta;
            Ok(())
        }
        async fn topic_preferences(&self, _u: Option<&str>) -> Result<BTreeMap<String, f64>, RelationalError> {
            Ok(self.topics.lock().unwrap().clone())
        }
    }

    fn coordinator() -> MemoryCoordinator {
        let relational: Arc<dyn RelationalStore> = Arc::new(FakeRelational::default());
        let session = SessionStore::new(Arc::new(InMemoryKvStore::new()), 10, Duration::from_secs(3600));
        let episodic = EpisodicCoordinator::new(relational.clone(), 5, 0.0, 0.1, 100);
        let procedural = ProceduralCoordinator::new(relational.clone(), 0.6, 3);
        MemoryCoordinator::new(session, episodic, procedural, relational)
    }

    #[tokio::test]
    async fn record_then_load_context_surfaces_turn_and_episode_and_topic() {
        let coordinator = coordinator();
        let turn = SessionTurn { role: TurnRole::User, content: "hi".into(), timestamp: chrono::Utc::now(), sources: None, confidence: None };
        let episode = Episode::new("e1".into(), Some("u1".into()), "hi".into(), vec![1.0, 0.0], "resp".into(), vec![], 0.8);
        coordinator.record(Some("u1"), Some("s1"), Some(turn), &episode, Some(("rust", 1.0))).await.unwrap();

        let ctx = coordinator.load_context(Some("u1"), Some("s1"), &[1.0, 0.0], "strategy").await.unwrap();
        assert_eq!(ctx.session_turns.len(), 1);
        assert_eq!(ctx.episodes.len(), 1);
        assert_eq!(ctx.topic_preferences.get("rust"), Some(&1.0));
        assert!(!ctx.degraded);
    }

    #[tokio::test]
    async fn apply_feedback_updates_episode_and_reweights_pattern() {
        let coordinator = coordinator();
        let episode = Episode::new("e1".into(), Some("u1".into()), "hi".into(), vec![1.0, 0.0], "resp".into(), vec![], 0.8);
        coordinator.record(Some("u1"), None, None, &episode, None).await.unwrap();
        coordinator.procedural.record(Some("u1"), "strategy", "hybrid", serde_json::json!({}), true).await.unwrap();

        coordinator.apply_feedback(Some("u1"), "e1", 1, Some("strategy"), Some("hybrid")).await.unwrap();

        let stored = coordinator.relational.get_episode("e1").await.unwrap().unwrap();
        assert_eq!(stored.feedback, crate::data::Feedback::Positive);
    }
}
