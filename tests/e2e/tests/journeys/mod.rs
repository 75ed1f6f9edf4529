//! Full journeys through the composed `Services`: index a real file on
//! disk, then route a query for it through the orchestrator end to end.

#[path = "../support/mod.rs"]
mod support;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use vantage_core::ingestion::FileStatus;
use vantage_core::orchestrator::Request;
use vantage_core::Event;

use support::{build_harness_with, FakeLlm};

#[tokio::test]
async fn indexed_document_is_answerable_through_a_full_search_request() {
    let llm = FakeLlm { answer: "the roadmap ships in Q3".to_string(), ..FakeLlm::default() };
    let harness = build_harness_with(vantage_core::EngineConfig::default(), llm);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roadmap.txt");
    std::fs::write(&path, "the product roadmap for this quarter ships three new integrations").unwrap();

    let status = harness.services.ingestion.ingest_file(&path).await;
    assert!(matches!(status, FileStatus::Indexed { .. }), "expected Indexed, got {status:?}");

    let (tx, mut rx) = mpsc::channel(32);
    let request = Request {
        request_id: "journey-1".to_string(),
        query: "what does my roadmap document say about this quarter".to_string(),
        user_id: None,
        session_id: Some("journey-session".to_string()),
        attached_documents: Vec::new(),
        filters: Default::default(),
        top_k: 5,
    };

    let driver = harness.services.driver.clone();
    let handle = tokio::spawn(async move { driver.process(request, tx, CancellationToken::new()).await });

    let mut saw_partial_results = false;
    while let Some(event) = rx.recv().await {
        if matches!(event, Event::PartialResults { .. }) {
            saw_partial_results = true;
        }
    }

    let result = handle.await.unwrap().unwrap();
    assert!(saw_partial_results, "a document-search query over an indexed document should surface partial results");
    assert!(!result.results.is_empty(), "expected at least one retrieved document in the final result");
    assert_eq!(result.results[0].document.filename, "roadmap.txt");

    let session = harness.services.memory.get_session("journey-session", None).await;
    assert!(!session.turns.is_empty(), "the journey should have recorded a session turn");
}
