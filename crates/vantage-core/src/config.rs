//! Engine configuration.
//!
//! One `EngineConfig` composed of nested per-concern structs, mirroring the
//! closed option set in spec §6.4. Every field has a `Default` matching the
//! documented default so a bare `EngineConfig::default()` is a usable
//! configuration for local development, the same way `VectorIndexConfig`,
//! `HybridSearchConfig` and `ConsolidationConfig` do in the teacher crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub vector: VectorConfig,
    pub search: SearchConfig,
    pub memory: MemoryConfig,
    pub ingest: IngestConfig,
    pub watcher: WatcherConfig,
    pub llm: LlmConfig,
    pub workflow: WorkflowConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vector: VectorConfig::default(),
            search: SearchConfig::default(),
            memory: MemoryConfig::default(),
            ingest: IngestConfig::default(),
            watcher: WatcherConfig::default(),
            llm: LlmConfig::default(),
            workflow: WorkflowConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Embedding dimension; must match the embedder's output (Open Question #2).
    pub dim: usize,
    pub index_m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self { dim: 768, index_m: 24, ef_construction: 128, ef_search: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub recall_top_k: usize,
    pub rerank_top_k: usize,
    pub vector_weight: f32,
    pub bm25_weight: f32,
    pub min_score: f32,
    pub rerank_enabled: bool,
    pub rerank_batch_size: usize,
    pub diversity_weight: f32,
    pub rrf_k: f32,
    pub graph_max_hops: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            recall_top_k: 50,
            rerank_top_k: 5,
            vector_weight: 0.7,
            bm25_weight: 0.3,
            min_score: 0.3,
            rerank_enabled: true,
            rerank_batch_size: 32,
            diversity_weight: 0.0,
            rrf_k: 60.0,
            graph_max_hops: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub session_window_size: usize,
    pub session_ttl_seconds: u64,
    pub episodic_decay_half_life_days: f64,
    pub episodic_prune_threshold: f64,
    pub episodic_top_k: usize,
    pub episodic_min_score: f64,
    pub procedural_min_confidence: f64,
    pub procedural_min_samples: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            session_window_size: 10,
            session_ttl_seconds: 3600,
            episodic_decay_half_life_days: 365.0,
            episodic_prune_threshold: 0.1,
            episodic_top_k: 5,
            episodic_min_score: 0.3,
            procedural_min_confidence: 0.6,
            procedural_min_samples: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub max_file_bytes: u64,
    pub max_content_chars: usize,
    pub allowed_extensions: Vec<String>,
    pub workers_extract: usize,
    pub workers_llm: usize,
    pub ocr_min_chars_threshold: usize,
    pub attachment_cache_ttl_seconds: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 100 * 1024 * 1024,
            max_content_chars: 50_000,
            allowed_extensions: vec![
                "txt", "md", "pdf", "docx", "doc", "csv", "xlsx", "png", "jpg", "jpeg",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            workers_extract: num_cpus_fallback(),
            workers_llm: 2,
            ocr_min_chars_threshold: 100,
            attachment_cache_ttl_seconds: 1800,
        }
    }
}

fn num_cpus_fallback() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub debounce_ms: u64,
    pub recursive: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { debounce_ms: 3000, recursive: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub timeout_ms: u64,
    pub temperature: f32,
    pub max_tokens: u32,
    pub unified_model: String,
    pub max_concurrent_calls: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            temperature: 0.3,
            max_tokens: 2048,
            unified_model: "local-unified".to_string(),
            max_concurrent_calls: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub timeout_ms: u64,
    pub node_timeout_ms: u64,
    pub retries: u32,
    pub breaker_threshold: u32,
    pub breaker_cooldown_ms: u64,
    pub event_channel_capacity: usize,
    pub max_decomposed_subqueries: usize,
    pub complexity_decompose_threshold: usize,
    pub quality_check_min_confidence: f64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            node_timeout_ms: 20_000,
            retries: 2,
            breaker_threshold: 5,
            breaker_cooldown_ms: 60_000,
            event_channel_capacity: 64,
            max_decomposed_subqueries: 5,
            complexity_decompose_threshold: 3,
            quality_check_min_confidence: 0.5,
        }
    }
}

impl WorkflowConfig {
    pub fn node_timeout(&self) -> Duration {
        Duration::from_millis(self.node_timeout_ms)
    }

    pub fn end_to_end_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_millis(self.breaker_cooldown_ms)
    }
}
