//! Capability and storage ports (spec §5 component table, §9 redesign flag
//! "Global singletons").
//!
//! Every external collaborator named in spec §1 ("deliberately out of
//! scope... injected capabilities/storage ports") is represented here as an
//! `async_trait` interface. Every port call is a suspension point (spec §5),
//! which is why these are async where the teacher's equivalent
//! (`agtrace-providers::traits`) is sync.
//!
//! Default implementations grounded on the teacher crate live under
//! [`default`].

pub mod default;

use crate::data::{Document, Entity, Relationship};
use crate::error::{EmbedError, ExtractError, KvError, LexicalStoreError, LlmError, RelationalError, RerankError, VectorStoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// A k-NN match against the vector index.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub doc_id: String,
    pub score: f32,
}

/// A lexical multi-match hit against the document fields listed in spec
/// §4.2 stage 3.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub doc_id: String,
    pub score: f32,
}

/// Boolean constraint pushed to the store (spec §4.2 "filters are pushed to
/// the store as boolean constraints").
#[derive(Debug, Clone)]
pub enum FilterValue {
    Scalar(Value),
    Range { min: Option<Value>, max: Option<Value> },
}

pub type Filters = BTreeMap<String, FilterValue>;

/// k-NN + boolean-filter vector search (spec §4.2 stage 3, §6.3 HNSW params).
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, doc: &Document) -> Result<(), VectorStoreError>;
    async fn delete(&self, doc_id: &str) -> Result<(), VectorStoreError>;
    async fn knn(&self, query: &[f32], k: usize, filters: &Filters) -> Result<Vec<VectorHit>, VectorStoreError>;
    fn dim(&self) -> usize;
}

/// Lexical multi-match over `{summary^3, filename^2, keywords^1.5,
/// full_content^1}` with fuzziness AUTO (spec §4.2 stage 3).
#[async_trait]
pub trait LexicalStore: Send + Sync {
    async fn upsert(&self, doc: &Document) -> Result<(), LexicalStoreError>;
    async fn delete(&self, doc_id: &str) -> Result<(), LexicalStoreError>;
    async fn multi_match(&self, query: &str, k: usize, filters: &Filters) -> Result<Vec<LexicalHit>, LexicalStoreError>;
}

/// `session:{session_id}` KV store with sliding TTL (spec §6.3).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: std::time::Duration) -> Result<(), KvError>;
    async fn delete(&self, key: &str) -> Result<(), KvError>;
}

/// Relational store: `episodes`, `procedural_patterns`, `entities`,
/// `relationships`, `documents`, and friends (spec §6.3). Kept as one
/// trait rather than per-table traits since a single SQL backend serves
/// all of them transactionally (spec §5 "inserts and counter updates use
/// transactions").
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn upsert_document(&self, doc: &Document) -> Result<(), RelationalError>;
    async fn get_document(&self, id: &str) -> Result<Option<Document>, RelationalError>;
    async fn list_documents(&self, filters: &Filters, limit: usize, offset: usize) -> Result<Vec<Document>, RelationalError>;
    async fn delete_document(&self, id: &str) -> Result<(), RelationalError>;

    async fn upsert_entity(&self, entity: &Entity) -> Result<(), RelationalError>;
    async fn get_entity(&self, id: &str) -> Result<Option<Entity>, RelationalError>;
    async fn find_entity_by_name(&self, normalized_name: &str, entity_type: crate::data::EntityType) -> Result<Option<Entity>, RelationalError>;
    async fn all_entities(&self) -> Result<Vec<Entity>, RelationalError>;
    async fn delete_entity(&self, id: &str) -> Result<(), RelationalError>;

    async fn upsert_relationship(&self, rel: &Relationship) -> Result<(), RelationalError>;
    async fn relationships_from(&self, source_id: &str) -> Result<Vec<Relationship>, RelationalError>;
    async fn relationships_touching(&self, entity_id: &str) -> Result<Vec<Relationship>, RelationalError>;
    async fn delete_relationships_for_document(&self, entity_id: &str, doc_id: &str) -> Result<(), RelationalError>;

    async fn insert_episode(&self, episode: &crate::data::Episode) -> Result<(), RelationalError>;
    async fn get_episode(&self, id: &str) -> Result<Option<crate::data::Episode>, RelationalError>;
    async fn update_episode(&self, episode: &crate::data::Episode) -> Result<(), RelationalError>;
    async fn episodes_for_user(&self, user_id: Option<&str>) -> Result<Vec<crate::data::Episode>, RelationalError>;
    async fn delete_episode(&self, id: &str) -> Result<(), RelationalError>;

    async fn upsert_procedural_pattern(&self, pattern: &crate::data::ProceduralPattern) -> Result<(), RelationalError>;
    async fn find_procedural_pattern(&self, user_id: Option<&str>, pattern_type: &str, data_key: &str) -> Result<Option<crate::data::ProceduralPattern>, RelationalError>;
    async fn procedural_patterns_for(&self, user_id: Option<&str>, pattern_type: &str) -> Result<Vec<crate::data::ProceduralPattern>, RelationalError>;

    async fn record_topic_interest(&self, user_id: Option<&str>, topic: &str, delta: f64) -> Result<(), RelationalError>;
    async fn topic_preferences(&self, user_id: Option<&str>) -> Result<BTreeMap<String, f64>, RelationalError>;
}

/// Strict-JSON-schema request to the LLM (spec §4.1, §4.3 stage 5, §4.6).
#[derive(Debug, Clone)]
pub struct JsonSchemaRequest {
    pub prompt: String,
    pub schema_name: &'static str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Generation/classification/summarization capability (spec §1 "the LLM
/// inference endpoint ... injected"). `generate` streams free text;
/// `generate_json` returns a raw JSON string the caller parses against its
/// own schema (keeps this trait schema-agnostic).
#[async_trait]
pub trait Llm: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String, LlmError>;
    async fn generate_json(&self, request: JsonSchemaRequest) -> Result<String, LlmError>;
    /// OCR + description for a single image/page, used by the ingestion
    /// extraction stage and the OCR fallback (spec §4.3 stage 3).
    async fn describe_image(&self, image_bytes: &[u8], mime_type: &str) -> Result<String, LlmError>;
}

/// Text → unit-normalized fixed-length vector (spec §4.2 stage 2).
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
    fn dim(&self) -> usize;
}

/// (query, document_text) joint scoring (spec §4.2 stage 6).
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, RerankError>;
    fn is_available(&self) -> bool;
}

/// Raw bytes → `{raw_text, tables?, metadata}` (spec §4.3 stage 3).
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    pub raw_text: String,
    pub tables: Option<String>,
    pub page_count: Option<u32>,
    pub author: Option<String>,
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, path: &std::path::Path, file_type: &str) -> Result<ExtractedContent, ExtractError>;
}
