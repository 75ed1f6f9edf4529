//! Shared port fakes for the end-to-end suites: in-memory stand-ins for
//! every injected capability, wired into a real `Services` the same way
//! `Services::bootstrap` would, but without a filesystem database, an HNSW
//! index, or a live LLM endpoint.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use vantage_core::config::EngineConfig;
use vantage_core::data::{Document, Entity, Episode, EntityType, ProceduralPattern, Relationship};
use vantage_core::error::{EmbedError, ExtractError, LexicalStoreError, LlmError, RelationalError, RerankError, VectorStoreError};
use vantage_core::graph::GraphStore;
use vantage_core::ports::default::InMemoryKvStore;
use vantage_core::ports::{Embedder, ExtractedContent, Extractor, Filters, JsonSchemaRequest, KvStore, LexicalHit, LexicalStore, Llm, RelationalStore, Reranker, VectorHit, VectorStore};
use vantage_core::services::Services;

/// Dimension used across every fake in this module; small enough that
/// hand-computed cosine scores in test assertions stay legible.
pub const TEST_DIM: usize = 16;

/// Deterministic bag-of-bytes embedding: stable across calls and distinct
/// for distinct text, without pulling in a real model.
fn embed_text(text: &str, dim: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    for (i, byte) in text.bytes().enumerate() {
        v[i % dim] += byte as f32;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

pub struct DeterministicEmbedder {
    pub dim: usize,
}

#[async_trait]
impl Embedder for DeterministicEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(embed_text(text, self.dim))
    }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| embed_text(t, self.dim)).collect())
    }
    fn dim(&self) -> usize {
        self.dim
    }
}

/// Cosine-ish k-NN over upserted embeddings (vectors aren't re-normalized
/// here, callers are expected to hand in unit vectors per the `Document`
/// invariant).
#[derive(Default)]
pub struct InMemoryVectorStore {
    dim: usize,
    entries: Mutex<Vec<(String, Vec<f32>)>>,
}

impl InMemoryVectorStore {
    pub fn new(dim: usize) -> Self {
        Self { dim, entries: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, doc: &Document) -> Result<(), VectorStoreError> {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|(id, _)| id != &doc.id);
        entries.push((doc.id.clone(), doc.embedding.clone()));
        Ok(())
    }
    async fn delete(&self, doc_id: &str) -> Result<(), VectorStoreError> {
        self.entries.lock().unwrap().retain(|(id, _)| id != doc_id);
        Ok(())
    }
    async fn knn(&self, query: &[f32], k: usize, _filters: &Filters) -> Result<Vec<VectorHit>, VectorStoreError> {
        let entries = self.entries.lock().unwrap();
        let mut scored: Vec<VectorHit> =
            entries.iter().map(|(id, emb)| VectorHit { doc_id: id.clone(), score: emb.iter().zip(query).map(|(a, b)| a * b).sum() }).collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
    fn dim(&self) -> usize {
        self.dim
    }
}

/// Term-overlap lexical search: word count matches against a lowercased
/// `{summary, filename, keywords, full_content}` blob per document, in
/// place of a real FTS5 index.
#[derive(Default)]
pub struct InMemoryLexicalStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryLexicalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LexicalStore for InMemoryLexicalStore {
    async fn upsert(&self, doc: &Document) -> Result<(), LexicalStoreError> {
        let keywords: Vec<&str> = doc.keywords.iter().map(String::as_str).collect();
        let text = format!("{} {} {} {}", doc.summary, doc.filename, keywords.join(" "), doc.full_content).to_lowercase();
        self.entries.lock().unwrap().insert(doc.id.clone(), text);
        Ok(())
    }
    async fn delete(&self, doc_id: &str) -> Result<(), LexicalStoreError> {
        self.entries.lock().unwrap().remove(doc_id);
        Ok(())
    }
    async fn multi_match(&self, query: &str, k: usize, _filters: &Filters) -> Result<Vec<LexicalHit>, LexicalStoreError> {
        let terms: Vec<String> = query.to_lowercase().split_whitespace().map(str::to_string).collect();
        let entries = self.entries.lock().unwrap();
        let mut hits: Vec<LexicalHit> = entries
            .iter()
            .filter_map(|(id, text)| {
                let matches = terms.iter().filter(|t| text.contains(t.as_str())).count();
                if matches == 0 {
                    None
                } else {
                    Some(LexicalHit { doc_id: id.clone(), score: matches as f32 })
                }
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }
}

/// Full `RelationalStore` surface backed by plain maps, for the same
/// reason `memory::tests::FakeRelational` exists but extended with real
/// document storage so ingestion idempotence has something to check
/// freshness against.
#[derive(Default)]
pub struct InMemoryRelationalStore {
    documents: Mutex<HashMap<String, Document>>,
    entities: Mutex<HashMap<String, Entity>>,
    relationships: Mutex<Vec<Relationship>>,
    episodes: Mutex<Vec<Episode>>,
    patterns: Mutex<Vec<ProceduralPattern>>,
    topics: Mutex<std::collections::BTreeMap<String, f64>>,
}

#[async_trait]
impl RelationalStore for InMemoryRelationalStore {
    async fn upsert_document(&self, doc: &Document) -> Result<(), RelationalError> {
        self.documents.lock().unwrap().insert(doc.id.clone(), doc.clone());
        Ok(())
    }
    async fn get_document(&self, id: &str) -> Result<Option<Document>, RelationalError> {
        Ok(self.documents.lock().unwrap().get(id).cloned())
    }
    async fn list_documents(&self, _filters: &Filters, limit: usize, offset: usize) -> Result<Vec<Document>, RelationalError> {
        let docs = self.documents.lock().unwrap();
        let mut all: Vec<Document> = docs.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }
    async fn delete_document(&self, id: &str) -> Result<(), RelationalError> {
        self.documents.lock().unwrap().remove(id);
        Ok(())
    }
    async fn upsert_entity(&self, entity: &Entity) -> Result<(), RelationalError> {
        self.entities.lock().unwrap().insert(entity.id.clone(), entity.clone());
        Ok(())
    }
    async fn get_entity(&self, id: &str) -> Result<Option<Entity>, RelationalError> {
        Ok(self.entities.lock().unwrap().get(id).cloned())
    }
    async fn find_entity_by_name(&self, normalized_name: &str, entity_type: EntityType) -> Result<Option<Entity>, RelationalError> {
        Ok(self.entities.lock().unwrap().values().find(|e| e.lookup_key() == normalized_name && e.entity_type == entity_type).cloned())
    }
    async fn all_entities(&self) -> Result<Vec<Entity>, RelationalError> {
        Ok(self.entities.lock().unwrap().values().cloned().collect())
    }
    async fn delete_entity(&self, id: &str) -> Result<(), RelationalError> {
        self.entities.lock().unwrap().remove(id);
        Ok(())
    }
    async fn upsert_relationship(&self, rel: &Relationship) -> Result<(), RelationalError> {
        let mut rels = self.relationships.lock().unwrap();
        if let Some(existing) = rels.iter_mut().find(|r| r.source_id == rel.source_id && r.target_id == rel.target_id && r.edge_type == rel.edge_type) {
            *existing = rel.clone();
        } else {
            rels.push(rel.clone());
        }
        Ok(())
    }
    async fn relationships_from(&self, source_id: &str) -> Result<Vec<Relationship>, RelationalError> {
        Ok(self.relationships.lock().unwrap().iter().filter(|r| r.source_id == source_id).cloned().collect())
    }
    async fn relationships_touching(&self, entity_id: &str) -> Result<Vec<Relationship>, RelationalError> {
        Ok(self.relationships.lock().unwrap().iter().filter(|r| r.source_id == entity_id || r.target_id == entity_id).cloned().collect())
    }
    async fn delete_relationships_for_document(&self, entity_id: &str, doc_id: &str) -> Result<(), RelationalError> {
        self.relationships.lock().unwrap().retain(|r| !(r.source_id == entity_id && r.document_ids.contains(doc_id)));
        Ok(())
    }
    async fn insert_episode(&self, episode: &Episode) -> Result<(), RelationalError> {
        self.episodes.lock().unwrap().push(episode.clone());
        Ok(())
    }
    async fn get_episode(&self, id: &str) -> Result<Option<Episode>, RelationalError> {
        Ok(self.episodes.lock().unwrap().iter().find(|e| e.id == id).cloned())
    }
    async fn update_episode(&self, episode: &Episode) -> Result<(), RelationalError> {
        let mut episodes = self.episodes.lock().unwrap();
        if let Some(existing) = episodes.iter_mut().find(|e| e.id == episode.id) {
            *existing = episode.clone();
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
    async fn record_topic_interest(&self, _user_id: Option<&str>, topic: &str, delta: f64) -> Result<(), RelationalError> {
        *self.topics.lock().unwrap().entry(topic.to_string()).or_insert(0.0) += delta;
        Ok(())
    }
    async fn topic_preferences(&self, _user_id: Option<&str>) -> Result<std::collections::BTreeMap<String, f64>, RelationalError> {
        Ok(self.topics.lock().unwrap().clone())
    }
}

/// Reads the file as UTF-8 (lossily), standing in for the teacher's
/// multi-format extractor backends.
pub struct PlainTextExtractor;

#[async_trait]
impl Extractor for PlainTextExtractor {
    async fn extract(&self, path: &std::path::Path, _file_type: &str) -> Result<ExtractedContent, ExtractError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(ExtractedContent { raw_text: String::from_utf8_lossy(&bytes).into_owned(), tables: None, page_count: None, author: None })
    }
}

/// Scripted LLM: `generate` returns a fixed answer (optionally after
/// `delay`, to give cancellation something to race against); `generate_json`
/// returns a fixed, schema-valid summary payload regardless of prompt.
pub struct FakeLlm {
    pub answer: String,
    pub summary_json: String,
    pub delay: Option<Duration>,
    pub generate_calls: AtomicUsize,
    pub generate_json_calls: AtomicUsize,
}

impl Default for FakeLlm {
    fn default() -> Self {
        Self {
            answer: "a generated answer".to_string(),
            summary_json: default_summary_json(),
            delay: None,
            generate_calls: AtomicUsize::new(0),
            generate_json_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeLlm {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }
}

fn default_summary_json() -> String {
    serde_json::json!({
        "summary": "a short summary of the document",
        "keywords": ["alpha", "beta", "gamma", "delta", "epsilon"],
        "entities": [],
        "topics": ["general", "testing", "alpha", "beta", "gamma"],
        "document_type": "other",
    })
    .to_string()
}

#[async_trait]
impl Llm for FakeLlm {
    async fn generate(&self, _prompt: &str, _temperature: f32, _max_tokens: u32) -> Result<String, LlmError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.answer.clone())
    }
    async fn generate_json(&self, _request: JsonSchemaRequest) -> Result<String, LlmError> {
        self.generate_json_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.summary_json.clone())
    }
    async fn describe_image(&self, _image_bytes: &[u8], _mime_type: &str) -> Result<String, LlmError> {
        Ok(String::new())
    }
}

/// Always-unavailable reranker, used where a test wants to assert the
/// rerank-skip fallback path rather than exercise real cross-encoder math.
pub struct UnavailableReranker;

#[async_trait]
impl Reranker for UnavailableReranker {
    async fn score(&self, _query: &str, documents: &[String]) -> Result<Vec<f32>, RerankError> {
        Err(RerankError::Unavailable(format!("no backend for {} documents", documents.len())))
    }
    fn is_available(&self) -> bool {
        false
    }
}

/// A fully wired `Services` over in-memory fakes, plus handles to the ones
/// tests need to poke or inspect directly.
pub struct Harness {
    pub services: Arc<Services>,
    pub llm: Arc<FakeLlm>,
    pub vector_store: Arc<InMemoryVectorStore>,
    pub lexical_store: Arc<InMemoryLexicalStore>,
    pub relational: Arc<InMemoryRelationalStore>,
    pub graph: Arc<GraphStore>,
}

pub fn build_harness() -> Harness {
    build_harness_with(EngineConfig::default(), FakeLlm::default())
}

pub fn build_harness_with(config: EngineConfig, llm: FakeLlm) -> Harness {
    let vector_store = Arc::new(InMemoryVectorStore::new(TEST_DIM));
    let lexical_store = Arc::new(InMemoryLexicalStore::new());
    let relational = Arc::new(InMemoryRelationalStore::default());
    let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
    let embedder: Arc<dyn Embedder> = Arc::new(DeterministicEmbedder { dim: TEST_DIM });
    let extractor: Arc<dyn Extractor> = Arc::new(PlainTextExtractor);
    let graph = Arc::new(GraphStore::new());
    let llm = Arc::new(llm);

    let vector_store_dyn: Arc<dyn VectorStore> = vector_store.clone();
    let lexical_store_dyn: Arc<dyn LexicalStore> = lexical_store.clone();
    let relational_dyn: Arc<dyn RelationalStore> = relational.clone();
    let llm_dyn: Arc<dyn Llm> = llm.clone();

    let services = Arc::new(Services::wire(config, vector_store_dyn, lexical_store_dyn, relational_dyn, kv, embedder, None, extractor, llm_dyn, graph.clone()));

    Harness { services, llm, vector_store, lexical_store, relational, graph }
}

/// A document with a deterministic embedding derived from `full_content`,
/// ready to seed the vector/lexical/relational fakes directly (bypassing
/// ingestion) for tests that only care about retrieval.
pub fn seeded_document(id: &str, filename: &str, summary: &str, full_content: &str) -> Document {
    Document {
        id: id.to_string(),
        filename: filename.to_string(),
        path: format!("/virtual/{filename}"),
        file_type: "txt".to_string(),
        doc_type: "other".to_string(),
        summary: summary.to_string(),
        detailed_summary: summary.to_string(),
        keywords: BTreeSet::new(),
        entities: BTreeSet::new(),
        topics: BTreeSet::new(),
        full_content: full_content.to_string(),
        embedding: embed_text(full_content, TEST_DIM),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        file_size: full_content.len() as u64,
        page_count: None,
        author: None,
        partial_index: false,
    }
}
