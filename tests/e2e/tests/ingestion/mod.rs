//! Ingestion idempotence and file-watcher debounce, exercised against the
//! real filesystem (a temp directory) rather than mocked I/O.

#[path = "../support/mod.rs"]
mod support;

use std::time::Duration;

use vantage_core::config::WatcherConfig;
use vantage_core::ingestion::{FileStatus, FileWatcher, WatchEvent};
use vantage_core::ports::RelationalStore;

use support::build_harness;

/// Ingesting the same unchanged file twice must skip the second time
/// (spec §4.3 stage 2 idempotence), and never re-summarize.
#[tokio::test]
async fn ingesting_the_same_file_twice_skips_on_the_second_pass() {
    let harness = build_harness();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "some notes about the quarterly roadmap").unwrap();

    let first = harness.services.ingestion.ingest_file(&path).await;
    assert!(matches!(first, FileStatus::Indexed { .. }), "expected Indexed, got {first:?}");

    let second = harness.services.ingestion.ingest_file(&path).await;
    assert!(matches!(second, FileStatus::Skipped { .. }), "expected Skipped on re-ingest of an unchanged file, got {second:?}");

    assert_eq!(harness.llm.generate_json_calls.load(std::sync::atomic::Ordering::SeqCst), 1, "summarization should only run on the first pass");
}

/// Touching a file's content after ingest makes it fresh again, so a
/// third ingest re-indexes it instead of skipping.
#[tokio::test]
async fn modifying_an_ingested_file_makes_it_eligible_for_reingest() {
    let harness = build_harness();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "version one").unwrap();

    let first = harness.services.ingestion.ingest_file(&path).await;
    assert!(matches!(first, FileStatus::Indexed { .. }));

    // Force updated_at behind the new mtime: the stored document's
    // updated_at is set at ingest time, so sleeping guarantees the
    // filesystem mtime below moves strictly later.
    tokio::time::sleep(Duration::from_millis(20)).await;
    std::fs::write(&path, "version two, materially different content").unwrap();

    let second = harness.services.ingestion.ingest_file(&path).await;
    assert!(matches!(second, FileStatus::Indexed { .. }), "expected re-ingest after modification, got {second:?}");

    let doc_id = match second {
        FileStatus::Indexed { doc_id } => doc_id,
        _ => unreachable!(),
    };
    let stored = harness.relational.get_document(&doc_id).await.unwrap().unwrap();
    assert!(stored.full_content.contains("version two"));
}

/// A burst of writes to the same file within the debounce window must
/// collapse into a single watch event, not one per write.
#[tokio::test]
async fn rapid_writes_to_one_file_collapse_into_a_single_debounced_event() {
    let dir = tempfile::tempdir().unwrap();
    let watcher_config = WatcherConfig { debounce_ms: 150, recursive: false };
    let mut watcher = FileWatcher::watch(dir.path(), &watcher_config).expect("failed to start watcher");

    let path = dir.path().join("burst.txt");
    for i in 0..5 {
        std::fs::write(&path, format!("revision {i}")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let mut events = Vec::new();
    let deadline = Duration::from_millis(150 * 3);
    let collect = async {
        while let Some(event) = watcher.events.recv().await {
            events.push(event);
        }
    };
    let _ = tokio::time::timeout(deadline, collect).await;

    let touching_burst_file = events.iter().filter(|e| matches!(e, WatchEvent::Created(p) | WatchEvent::Modified(p) if p == &path)).count();
    assert_eq!(touching_burst_file, 1, "five rapid writes inside the debounce window should collapse to one event, got {events:?}");
}
