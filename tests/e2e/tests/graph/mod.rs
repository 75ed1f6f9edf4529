//! Graph expansion: BFS hop distance decays the fused score the further a
//! document sits from the originally resolved entity.

#[path = "../support/mod.rs"]
mod support;

use std::collections::{BTreeMap, BTreeSet};

use vantage_core::data::{Entity, EntityType, Relationship, RelationshipType};
use vantage_core::graph::{expand, GraphStore};
use vantage_core::ports::{LexicalStore, RelationalStore, VectorStore};
use vantage_core::retrieval::{RetrievalRequest, Strategy};

use support::{build_harness, seeded_document};

fn entity(id: &str, name: &str, doc_ids: &[&str]) -> Entity {
    Entity { id: id.to_string(), name: name.to_string(), entity_type: EntityType::Person, document_ids: doc_ids.iter().map(|s| s.to_string()).collect(), properties: BTreeMap::new() }
}

fn edge(from: &str, to: &str) -> Relationship {
    Relationship { source_id: from.to_string(), target_id: to.to_string(), edge_type: RelationshipType::RelatedTo, weight: 1.0, document_ids: BTreeSet::new() }
}

/// acme --knows--> zeta --knows--> omega, each authoring a distinct
/// document; BFS from "acme" must reach omega's document at hop 2.
fn build_chain_graph() -> GraphStore {
    let graph = GraphStore::new();
    graph.upsert_entity(entity("acme", "Acme", &["doc-acme"]));
    graph.upsert_entity(entity("zeta", "Zeta", &["doc-zeta"]));
    graph.upsert_entity(entity("omega", "Omega", &["doc-omega"]));
    graph.upsert_edge(edge("acme", "zeta"));
    graph.upsert_edge(edge("zeta", "omega"));
    graph
}

#[tokio::test]
async fn expand_assigns_increasing_hop_distance_along_the_chain() {
    let graph = build_chain_graph();
    let result = expand(&graph, &["Acme".to_string()], 5);

    let hops: BTreeMap<String, u32> = result.related_document_hops.into_iter().collect();
    assert_eq!(hops.get("doc-acme"), Some(&0));
    assert_eq!(hops.get("doc-zeta"), Some(&1));
    assert_eq!(hops.get("doc-omega"), Some(&2));
}

#[tokio::test]
async fn max_hops_bounds_how_far_expansion_reaches() {
    let graph = build_chain_graph();
    let result = expand(&graph, &["Acme".to_string()], 1);

    let hops: BTreeMap<String, u32> = result.related_document_hops.into_iter().collect();
    assert!(hops.contains_key("doc-zeta"));
    assert!(!hops.contains_key("doc-omega"), "omega sits at hop 2 and should be out of reach with max_hops=1");
}

/// Through the full retrieval pipeline, the document reached at hop 0
/// (authored by the resolved entity directly) must score at least as high
/// as one reached only through graph expansion at a greater hop distance,
/// since the decay `graph_weight * (1/(1+hop))` strictly favors lower hops.
#[tokio::test]
async fn graph_augmentation_favors_closer_hops_in_fused_ranking() {
    let harness = build_harness();
    let graph = &harness.graph;
    graph.upsert_entity(entity("acme", "Acme", &["doc-acme"]));
    graph.upsert_entity(entity("zeta", "Zeta", &["doc-zeta"]));
    graph.upsert_edge(edge("acme", "zeta"));

    // Neither document matches the query lexically or semantically on its
    // own; any fused score they receive comes entirely from graph decay.
    let near = seeded_document("doc-acme", "near.md", "unrelated filler text", "unrelated filler text with no query overlap");
    let far = seeded_document("doc-zeta", "far.md", "unrelated filler text", "unrelated filler text with no query overlap either");
    for doc in [&near, &far] {
        harness.vector_store.upsert(doc).await.unwrap();
        harness.lexical_store.upsert(doc).await.unwrap();
        harness.relational.upsert_document(doc).await.unwrap();
    }

    let request = RetrievalRequest {
        query: "tell me about acme's team".to_string(),
        filters: Default::default(),
        top_k: 10,
        strategy: Some(Strategy::Exploratory),
        entity_names: vec!["Acme".to_string()],
    };
    let outcome = harness.services.retrieval.retrieve(request).await.unwrap();

    let acme_score = outcome.raw_scores.iter().find(|(id, _)| id == "doc-acme").map(|(_, s)| *s);
    let zeta_score = outcome.raw_scores.iter().find(|(id, _)| id == "doc-zeta").map(|(_, s)| *s);
    assert!(acme_score.is_some() && zeta_score.is_some(), "both documents should receive graph-augmented scores: {:?}", outcome.raw_scores);
    assert!(acme_score.unwrap() > zeta_score.unwrap(), "hop-0 document should outscore the hop-1 document: acme={acme_score:?} zeta={zeta_score:?}");
}
