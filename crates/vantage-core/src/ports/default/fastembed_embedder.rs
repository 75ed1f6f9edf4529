//! Default embedder port: local ONNX inference via `fastembed`.
//!
//! Grounded on `embeddings/local.rs` (`get_model`/`EmbeddingService`): same
//! cache-dir resolution and global-model-once pattern, generalized behind
//! the [`Embedder`] trait and the configured dimension (spec §6.4
//! `vector.dim`) instead of the teacher's fixed Matryoshka truncation.

use crate::error::EmbedError;
use crate::ports::Embedder;
use async_trait::async_trait;
use std::sync::{Mutex, OnceLock};

#[cfg(feature = "embeddings")]
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

fn cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("VANTAGE_EMBED_CACHE_PATH") {
        return std::path::PathBuf::from(path);
    }
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "vantage", "core") {
        return proj_dirs.cache_dir().join("fastembed");
    }
    std::path::PathBuf::from(".fastembed_cache")
}

#[cfg(feature = "embeddings")]
static MODEL: OnceLock<Result<Mutex<TextEmbedding>, String>> = OnceLock::new();

#[cfg(feature = "embeddings")]
fn model() -> Result<std::sync::MutexGuard<'static, TextEmbedding>, EmbedError> {
    let result = MODEL.get_or_init(|| {
        let dir = cache_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!("failed to create embedding cache dir {:?}: {}", dir, e);
        }
        let options = InitOptions::new(EmbeddingModel::NomicEmbedTextV15)
            .with_show_download_progress(true)
            .with_cache_dir(dir);
        TextEmbedding::try_new(options).map(Mutex::new).map_err(|e| e.to_string())
    });
    match result {
        Ok(m) => m.lock().map_err(|e| EmbedError::Backend(format!("lock poisoned: {e}"))),
        Err(e) => Err(EmbedError::Unavailable(e.clone())),
    }
}

/// Truncates a raw embedding to `dim` and re-normalizes (Matryoshka
/// Representation Learning: the first `dim` components of the full vector
/// already form a valid lower-dimensional embedding).
pub fn truncate_and_normalize(mut v: Vec<f32>, dim: usize) -> Vec<f32> {
    v.truncate(dim);
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

pub struct FastEmbedEmbedder {
    dim: usize,
}

impl FastEmbedEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl Embedder for FastEmbedEmbedder {
    #[cfg(feature = "embeddings")]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.is_empty() {
            return Err(EmbedError::Backend("text cannot be empty".into()));
        }
        let dim = self.dim;
        let text = text.to_string();
        tokio::task::spawn_blocking(move || {
            let mut m = model()?;
            let out = m.embed(vec![text.as_str()], None).map_err(|e| EmbedError::Backend(e.to_string()))?;
            let raw = out.into_iter().next().ok_or_else(|| EmbedError::Backend("no embedding produced".into()))?;
            Ok(truncate_and_normalize(raw, dim))
        })
        .await
        .map_err(|e| EmbedError::Backend(e.to_string()))?
    }

    #[cfg(not(feature = "embeddings"))]
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Unavailable("embeddings feature disabled".into()))
    }

    #[cfg(feature = "embeddings")]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let dim = self.dim;
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut m = model()?;
            let mut out = Vec::with_capacity(texts.len());
            for chunk in texts.chunks(32) {
                let refs: Vec<&str> = chunk.iter().map(|s| s.as_str()).collect();
                let batch = m.embed(refs, None).map_err(|e| EmbedError::Backend(e.to_string()))?;
                out.extend(batch.into_iter().map(|v| truncate_and_normalize(v, dim)));
            }
            Ok(out)
        })
        .await
        .map_err(|e| EmbedError::Backend(e.to_string()))?
    }

    #[cfg(not(feature = "embeddings"))]
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Err(EmbedError::Unavailable("embeddings feature disabled".into()))
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}
