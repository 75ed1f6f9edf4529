//! Pure hybrid search: vector-only, lexical-only and both-agree results
//! fuse into a single ranked list via `RetrievalPipeline::retrieve`.

#[path = "../support/mod.rs"]
mod support;

use vantage_core::ports::{LexicalStore, RelationalStore, VectorStore};
use vantage_core::retrieval::RetrievalRequest;

use support::{build_harness, seeded_document};

async fn seed(harness: &support::Harness, doc: vantage_core::data::Document) {
    harness.vector_store.upsert(&doc).await.unwrap();
    harness.lexical_store.upsert(&doc).await.unwrap();
    harness.relational.upsert_document(&doc).await.unwrap();
}

#[tokio::test]
async fn hybrid_search_surfaces_the_document_matching_both_signals_first() {
    let harness = build_harness();

    // `relevant`'s content literally contains the query, so it both wins
    // the term-overlap lexical match and gets the nearest embedding
    // (the deterministic embedder is a pure function of text content).
    let query = "onboarding checklist badges laptops";
    let relevant = seeded_document("doc-relevant", "onboarding.md", "new hire onboarding", query);
    let filler_one = seeded_document("doc-filler-1", "minutes.md", "quarterly board minutes", "quarterly board minutes discussing budget allocations for next year");
    let filler_two = seeded_document("doc-filler-2", "recipe.md", "sourdough starter notes", "feeding schedule and hydration ratio for a sourdough starter");

    seed(&harness, relevant.clone()).await;
    seed(&harness, filler_one.clone()).await;
    seed(&harness, filler_two.clone()).await;

    let request = RetrievalRequest { query: query.to_string(), filters: Default::default(), top_k: 10, strategy: None, entity_names: Vec::new() };

    let outcome = harness.services.retrieval.retrieve(request).await.unwrap();
    assert!(!outcome.results.is_empty());
    assert_eq!(outcome.results[0].document.id, "doc-relevant", "the document matching both vector and lexical signals should rank first: {:?}", outcome.results);
}

#[tokio::test]
async fn a_lexical_only_match_still_outranks_a_document_with_no_overlap() {
    let harness = build_harness();

    // `lexical_match` shares no embedding similarity worth mentioning with
    // the query (different wording) but does share every query term, so
    // the lexical RRF contribution alone should lift it above a filler
    // document matching neither signal.
    let lexical_match = seeded_document("doc-lexical", "summary.md", "onboarding checklist badges laptops", "an entry whose summary alone carries the matching terms");
    let filler = seeded_document("doc-filler", "unrelated.md", "unrelated filler content", "nothing here relates to onboarding at all");

    seed(&harness, lexical_match.clone()).await;
    seed(&harness, filler.clone()).await;

    let request =
        RetrievalRequest { query: "onboarding checklist badges laptops".to_string(), filters: Default::default(), top_k: 10, strategy: None, entity_names: Vec::new() };

    let outcome = harness.services.retrieval.retrieve(request).await.unwrap();
    let lexical_score = outcome.raw_scores.iter().find(|(id, _)| id == "doc-lexical").map(|(_, s)| *s).unwrap_or(0.0);
    let filler_score = outcome.raw_scores.iter().find(|(id, _)| id == "doc-filler").map(|(_, s)| *s).unwrap_or(0.0);
    assert!(lexical_score > filler_score, "lexical-only match ({lexical_score}) should outrank the no-overlap filler ({filler_score})");
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let harness = build_harness();
    let request = RetrievalRequest { query: String::new(), filters: Default::default(), top_k: 5, strategy: None, entity_names: Vec::new() };
    let result = harness.services.retrieval.retrieve(request).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn no_matching_documents_returns_empty_results_not_an_error() {
    let harness = build_harness();
    let request = RetrievalRequest { query: "nothing indexed yet".to_string(), filters: Default::default(), top_k: 5, strategy: None, entity_names: Vec::new() };
    let outcome = harness.services.retrieval.retrieve(request).await.unwrap();
    assert!(outcome.results.is_empty());
}
