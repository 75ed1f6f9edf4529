//! Document: an indexed item (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// A document as stored by the relational/vector/lexical ports.
///
/// Identity is `id`, a stable hash of the canonical file path. `embedding`
/// must be unit-normalized and exactly `dim` long; callers construct via
/// [`Document::new`] to keep that invariant at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub path: String,
    pub file_type: String,
    pub doc_type: String,
    pub summary: String,
    pub detailed_summary: String,
    pub keywords: BTreeSet<String>,
    pub entities: BTreeSet<String>,
    pub topics: BTreeSet<String>,
    pub full_content: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub file_size: u64,
    pub page_count: Option<u32>,
    pub author: Option<String>,
    /// Set true when summarization fell back to a truncated-text summary
    /// because JSON parsing failed (ingestion stage 5).
    pub partial_index: bool,
}

/// Maximum characters retained in `full_content` (spec §3, §4.3 stage 4).
pub const MAX_CONTENT_CHARS: usize = 50_000;

impl Document {
    /// Deterministic id derived from the canonical absolute path.
    pub fn id_for_path(canonical_path: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(canonical_path.as_bytes());
        let digest = hasher.finalize();
        hex_encode(&digest[..16])
    }

    /// Truncate `full_content` deterministically to [`MAX_CONTENT_CHARS`],
    /// cutting on a char boundary (never splitting a multi-byte codepoint).
    pub fn truncate_content(text: &str) -> String {
        if text.chars().count() <= MAX_CONTENT_CHARS {
            return text.to_string();
        }
        text.chars().take(MAX_CONTENT_CHARS).collect()
    }

    /// Validate the embedding dimension invariant.
    pub fn check_embedding_dim(&self, expected_dim: usize) -> Result<(), crate::error::EngineError> {
        if self.embedding.len() != expected_dim {
            return Err(crate::error::EngineError::InputInvalid(format!(
                "document {} has embedding dimension {}, expected {}",
                self.id,
                self.embedding.len(),
                expected_dim
            )));
        }
        Ok(())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

/// A retrieval candidate: a document plus the scoring context produced by
/// the hybrid pipeline (spec §4.2 step 8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
    pub highlights: Option<Vec<String>>,
}
