//! Procedural tier of the memory coordinator (spec §4.4): learned
//! (user, pattern_type, data_key) → preference counters.

use crate::data::ProceduralPattern;
use crate::error::EngineResult;
use crate::ports::RelationalStore;
use std::sync::Arc;

pub struct ProceduralCoordinator {
    relational: Arc<dyn RelationalStore>,
    min_confidence: f64,
    min_sample_size: u64,
}

impl ProceduralCoordinator {
    pub fn new(relational: Arc<dyn RelationalStore>, min_confidence: f64, min_sample_size: u64) -> Self {
        Self { relational, min_confidence, min_sample_size }
    }

    /// Record a success/failure observation, creating the pattern on first
    /// use (spec §4.4 `record`).
    pub async fn record(
        &self,
        user_id: Option<&str>,
        pattern_type: &str,
        data_key: &str,
        data: serde_json::Value,
        succeeded: bool,
    ) -> EngineResult<()> {
        let mut pattern = match self.relational.find_procedural_pattern(user_id, pattern_type, data_key).await? {
            Some(p) => p,
            None => ProceduralPattern::new(uuid::Uuid::new_v4().to_string(), user_id.map(String::from), pattern_type.to_string(), data_key.to_string(), data),
        };
        pattern.record(succeeded);
        self.relational.upsert_procedural_pattern(&pattern).await?;
        Ok(())
    }

    /// Patterns applicable to this (user, pattern_type) — confidence and
    /// sample size above the configured minimums (spec §4.4).
    pub async fn applicable(&self, user_id: Option<&str>, pattern_type: &str) -> EngineResult<Vec<ProceduralPattern>> {
        let patterns = self.relational.procedural_patterns_for(user_id, pattern_type).await?;
        Ok(patterns.into_iter().filter(|p| p.is_applicable(self.min_confidence, self.min_sample_size)).collect())
    }

    /// Reweight on feedback: a positive episode reinforces the pattern
    /// that produced it, negative feedback records a failure (spec §4.4
    /// `apply_feedback`).
    pub async fn reweight_on_feedback(&self, user_id: Option<&str>, pattern_type: &str, data_key: &str, positive: bool) -> EngineResult<()> {
        if let Some(mut pattern) = self.relational.find_procedural_pattern(user_id, pattern_type, data_key).await? {
            pattern.record(positive);
            self.relational.upsert_procedural_pattern(&pattern).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Document, Entity, EntityType, Episode, Relationship};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRelational {
        patterns: Mutex<Vec<ProceduralPattern>>,
    }

    #[async_trait]
    impl RelationalStore for FakeRelational {
        async fn upsert_document(&self, _doc: &Document) -> Result<(), crate::error::RelationalError> {
            Ok(())
        }
        async fn get_document(&self, _id: &str) -> Result<Option<Document>, crate::error::RelationalError> {
            Ok(None)
        }
        async fn list_documents(&self, _filters: &crate::ports::Filters, _limit: usize, _offset: usize) -> Result<Vec<Document>, crate::error::RelationalError> {
            Ok(vec![])
        }
        async fn delete_document(&self, _id: &str) -> Result<(), crate::error::RelationalError> {
            Ok(())
        }
        async fn upsert_entity(&self, _entity: &Entity) -> Result<(), crate::error::RelationalError> {
            Ok(())
        }
        async fn get_entity(&self, _id: &str) -> Result<Option<Entity>, crate::error::RelationalError> {
            Ok(None)
        }
        async fn find_entity_by_name(&self, _n: &str, _t: EntityType) -> Result<Option<Entity>, crate::error::RelationalError> {
            Ok(None)
        }
        async fn all_entities(&self) -> Result<Vec<Entity>, crate::error::RelationalError> {
            Ok(vec![])
        }
        async fn delete_entity(&self, _id: &str) -> Result<(), crate::error::RelationalError> {
            Ok(())
        }
        async fn upsert_relationship(&self, _rel: &Relationship) -> Result<(), crate::error::RelationalError> {
            Ok(())
        }
        async fn relationships_from(&self, _id: &str) -> Result<Vec<Relationship>, crate::error::RelationalError> {
            Ok(vec![])
        }
        async fn relationships_touching(&self, _id: &str) -> Result<Vec<Relationship>, crate::error::RelationalError> {
            Ok(vec![])
        }
        async fn delete_relationships_for_document(&self, _e: &str, _d: &str) -> Result<(), crate::error::RelationalError> {
            Ok(())
        }
        async fn insert_episode(&self, _e: &Episode) -> Result<(), crate::error::RelationalError> {
            Ok(())
        }
        async fn get_episode(&self, _id: &str) -> Result<Option<Episode>, crate::error::RelationalError> {
            Ok(None)
        }
        async fn update_episode(&self, _e: &Episode) -> Result<(), crate::error::RelationalError> {
            Ok(())
        }
        async fn episodes_for_user(&self, _u: Option<&str>) -> Result<Vec<Episode>, crate::error::RelationalError> {
            Ok(vec![])
        }
        async fn delete_episode(&self, _id: &str) -> Result<(), crate::error::RelationalError> {
            Ok(())
        }
        async fn upsert_procedural_pattern(&self, pattern: &ProceduralPattern) -> Result<(), crate::error::RelationalError> {
            let mut patterns = self.patterns.lock().unwrap();
            if let Some(existing) = patterns.iter_mut().find(|p| p.id == pattern.id) {
                *existing = pattern.clone();
            } else {
                patterns.push(pattern.clone());
            }
            Ok(())
        }
        async fn find_procedural_pattern(&self, user_id: Option<&str>, pattern_type: &str, data_key: &str) -> Result<Option<ProceduralPattern>, crate::error::RelationalError> {
            let patterns = self.patterns.lock().unwrap();
            Ok(patterns.iter().find(|p| p.user_id.as_deref() == user_id && p.pattern_type == pattern_type && p.data_key == data_key).cloned())
        }
        async fn procedural_patterns_for(&self, user_id: Option<&str>, pattern_type: &str) -> Result<Vec<ProceduralPattern>, crate::error::RelationalError> {
            let patterns = self.patterns.lock().unwrap();
            Ok(patterns.iter().filter(|p| p.user_id.as_deref() == user_id && p.pattern_type == pattern_type).cloned().collect())
        }
        async fn record_topic_interest(&self, _u: Option<&str>, _t: &str, _d: f64) -> Result<(), crate::error::RelationalError> {
            Ok(())
        }
        async fn topic_preferences(&self, _u: Option<&str>) -> Result<BTreeMap<String, f64>, crate::error::RelationalError> {
            Ok(BTreeMap::new())
        }
    }

    #[tokio::test]
    async fn pattern_becomes_applicable_after_enough_successes() {
        let relational = Arc::new(FakeRelational::default());
        let coordinator = ProceduralCoordinator::new(relational, 0.6, 3);
        for _ in 0..4 {
            coordinator.record(Some("u1"), "strategy", "hybrid", serde_json::json!({}), true).await.unwrap();
        }
        let applicable = coordinator.applicable(Some("u1"), "strategy").await.unwrap();
        assert_eq!(applicable.len(), 1);
    }

    #[tokio::test]
    async fn pattern_not_applicable_below_sample_threshold() {
        let relational = Arc::new(FakeRelational::default());
        let coordinator = ProceduralCoordinator::new(relational, 0.6, 3);
        coordinator.record(Some("u1"), "strategy", "hybrid", serde_json::json!({}), true).await.unwrap();
        let applicable = coordinator.applicable(Some("u1"), "strategy").await.unwrap();
        assert!(applicable.is_empty());
    }
}
