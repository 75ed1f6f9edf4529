//! Durable retry buffer (spec §4.3 "Concurrency"): on repeated relational
//! store failure, processed documents are buffered and retried on a
//! fixed interval rather than dropped.

use crate::data::Document;
use crate::ports::RelationalStore;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default retry interval (spec §4.3: "retry every 30s").
pub const RETRY_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Default)]
pub struct RetryQueue {
    pending: Mutex<VecDeque<Document>>,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, doc: Document) {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).push_back(doc);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn drain(&self) -> Vec<Document> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).drain(..).collect()
    }
}

/// Background task: every `interval`, drain the queue and retry each
/// document's upsert; documents that fail again go back on the queue.
pub async fn run_retry_loop(
    queue: Arc<RetryQueue>,
    relational: Arc<dyn RelationalStore>,
    interval: Duration,
    cancellation: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancellation.cancelled() => return,
            _ = ticker.tick() => {
                for doc in queue.drain() {
                    if relational.upsert_document(&doc).await.is_err() {
                        tracing::warn!(doc_id = %doc.id, "retry queue: upsert failed again, re-queuing");
                        queue.push(doc);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Entity, EntityType, Relationship};
    use crate::error::RelationalError;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyRelational {
        attempts: AtomicUsize,
        fail_first_n: usize,
    }

    #[async_trait]
    impl RelationalStore for FlakyRelational {
        async fn upsert_document(&self, _doc: &Document) -> Result<(), RelationalError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first_n {
                Err(RelationalError::Unavailable("down".into()))
            } else {
                Ok(())
            }
        }
        async fn get_document(&self, _id: &str) -> Result<Option<Document>, RelationalError> {
            Ok(None)
        }
        async fn list_documents(&self, _f: &crate::ports::Filters, _l: usize, _o: usize) -> Result<Vec<Document>, RelationalError> {
            Ok(vec![])
        }
        async fn delete_document(&self, _id: &str) -> Result<(), RelationalError> {
            Ok(())
        }
        async fn upsert_entity(&self, _e: &Entity) -> Result<(), RelationalError> {
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
        async fn upsert_relationship(&self, _r: &Relationship) -> Result<(), RelationalError> {
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
        async fn insert_episode(&self, _e: &crate::data::Episode) -> Result<(), RelationalError> {
            Ok(())
        }
        async fn get_episode(&self, _id: &str) -> Result<Option<crate::data::Episode>, RelationalError> {
            Ok(None)
        }
        async fn update_episode(&self, _e: &crate::data::Episode) -> Result<(), RelationalError> {
            Ok(())
        }
        async fn episodes_for_user(&self, _u: Option<&str>) -> Result<Vec<crate::data::Episode>, RelationalError> {
            Ok(vec![])
        }
        async fn delete_episode(&self, _id: &str) -> Result<(), RelationalError> {
            Ok(())
        }
        async fn upsert_procedural_pattern(&self, _p: &crate::data::ProceduralPattern) -> Result<(), RelationalError> {
            Ok(())
        }
        async fn find_procedural_pattern(&self, _u: Option<&str>, _t: &str, _k: &str) -> Result<Option<crate::data::ProceduralPattern>, RelationalError> {
            Ok(None)
        }
        async fn procedural_patterns_for(&self, _u: Option<&str>, _t: &str) -> Result<Vec<crate::data::ProceduralPattern>, RelationalError> {
            Ok(vec![])
        }
        async fn record_topic_interest(&self, _u: Option<&str>, _t: &str, _d: f64) -> Result<(), RelationalError> {
            Ok(())
        }
        async fn topic_preferences(&self, _u: Option<&str>) -> Result<BTreeMap<String, f64>, RelationalError> {
            Ok(BTreeMap::new())
        }
    }

    fn doc(id: &str) -> Document {
        Document {
            id: id.to_string(),
            filename: "f".into(),
            path: "/f".into(),
            file_type: "txt".into(),
            doc_type: "other".into(),
            summary: String::new(),
            detailed_summary: String::new(),
            keywords: Default::default(),
            entities: Default::default(),
            topics: Default::default(),
            full_content: String::new(),
            embedding: vec![],
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            file_size: 0,
            page_count: None,
            author: None,
            partial_index: false,
        }
    }

    #[tokio::test]
    async fn failed_upsert_is_requeued_and_succeeds_on_next_drain() {
        let queue = Arc::new(RetryQueue::new());
        queue.push(doc("d1"));
        let relational: Arc<dyn RelationalStore> = Arc::new(FlakyRelational { attempts: AtomicUsize::new(0), fail_first_n: 1 });

        for doc in queue.drain() {
            if relational.upsert_document(&doc).await.is_err() {
                queue.push(doc);
            }
        }
        assert_eq!(queue.len(), 1);

        for doc in queue.drain() {
            if relational.upsert_document(&doc).await.is_err() {
                queue.push(doc);
            }
        }
        assert_eq!(queue.len(), 0);
    }
}
