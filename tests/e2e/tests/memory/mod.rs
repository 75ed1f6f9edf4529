//! Session/episodic/procedural memory through the fully-wired
//! `MemoryCoordinator`.

#[path = "../support/mod.rs"]
mod support;

use vantage_core::data::{Episode, SessionTurn, TurnRole};
use vantage_core::ports::RelationalStore;

use support::build_harness;

fn turn(role: TurnRole, content: &str) -> SessionTurn {
    SessionTurn { role, content: content.to_string(), timestamp: chrono::Utc::now(), sources: None, confidence: None }
}

#[tokio::test]
async fn pushed_turns_are_visible_in_the_same_session() {
    let harness = build_harness();
    harness.services.memory.push_turn("session-1", None, turn(TurnRole::User, "what is our refund policy")).await;
    harness.services.memory.push_turn("session-1", None, turn(TurnRole::Assistant, "refunds are processed within 5 business days")).await;

    let session = harness.services.memory.get_session("session-1", None).await;
    assert_eq!(session.turns.len(), 2);
}

#[tokio::test]
async fn clearing_a_session_drops_its_turns() {
    let harness = build_harness();
    harness.services.memory.push_turn("session-2", None, turn(TurnRole::User, "hello")).await;
    harness.services.memory.clear_session("session-2").await;

    let session = harness.services.memory.get_session("session-2", None).await;
    assert!(session.turns.is_empty());
}

#[tokio::test]
async fn recorded_episode_is_recalled_by_embedding_similarity() {
    let harness = build_harness();
    let embedding = vec![1.0_f32; support::TEST_DIM];
    let episode = Episode::new("ep-1".to_string(), None, "what is our refund policy".to_string(), embedding.clone(), "refunds within 5 days".to_string(), vec![], 0.9);

    harness.services.memory.record(None, None, None, &episode, None).await.unwrap();

    let context = harness.services.memory.load_context(None, None, &embedding, "search").await.unwrap();
    assert!(context.episodes.iter().any(|e| e.id == "ep-1"), "expected the recorded episode to be recalled: {:?}", context.episodes);
}

#[tokio::test]
async fn positive_feedback_updates_episode_rating() {
    let harness = build_harness();
    let embedding = vec![0.5_f32; support::TEST_DIM];
    let episode = Episode::new("ep-2".to_string(), None, "query".to_string(), embedding, "response".to_string(), vec![], 0.7);
    harness.services.memory.record(None, None, None, &episode, None).await.unwrap();

    harness.services.memory.apply_feedback(None, "ep-2", 1, None, None).await.unwrap();

    let stored = harness.relational.get_episode("ep-2").await.unwrap().expect("episode should still exist");
    assert!(matches!(stored.feedback, vantage_core::data::Feedback::Positive));
}
