//! Crate-wide error taxonomy.
//!
//! One enum covers every failure domain the engine surfaces to callers;
//! port-specific errors (storage, LLM, embedder, ...) are their own
//! `thiserror` enums that convert into [`EngineError`] via `From`.

use thiserror::Error;

/// Errors produced by the orchestrator, retrieval pipeline, ingestion
/// pipeline, memory coordinator and graph expansion.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Validation failure: empty/oversized query, dimension mismatch, bad filter key.
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// Requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Idempotency clash (e.g. concurrent upsert of the same doc_id).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A downstream port is down or has exceeded its timeout.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Transient failure eligible for the node retry policy.
    #[error("retriable error: {0}")]
    Retriable(String),

    /// Cooperative cancellation observed at a suspension point.
    #[error("cancelled")]
    Cancelled,

    /// A configured timeout elapsed (node, stage, or end-to-end).
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Programmer bug; logged with full context, surfaced generically.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Whether the node retry policy (§4.1) should retry this error.
    pub fn retriable(&self) -> bool {
        matches!(self, EngineError::Retriable(_) | EngineError::Unavailable(_))
    }

    /// Whether this error must propagate to the caller immediately rather
    /// than being absorbed into a degraded-mode fallback.
    pub fn propagates_immediately(&self) -> bool {
        matches!(
            self,
            EngineError::Cancelled | EngineError::Timeout(_) | EngineError::InputInvalid(_)
        )
    }

    pub fn input_invalid(msg: impl Into<String>) -> Self {
        EngineError::InputInvalid(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        EngineError::Internal(msg.into())
    }
}

/// Errors from the vector-store port.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VectorStoreError {
    #[error("index unavailable: {0}")]
    Unavailable(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("usearch error: {0}")]
    Backend(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the lexical-store port.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LexicalStoreError {
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("query error: {0}")]
    Query(String),
}

/// Errors from the KV (session) store port.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KvError {
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors from the relational store port.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RelationalError {
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Errors from the LLM capability port.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("malformed json response: {0}")]
    MalformedJson(String),
    #[error("cancelled")]
    Cancelled,
}

/// Errors from the embedder capability port.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EmbedError {
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors from the reranker capability port.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RerankError {
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors from the document extractor capability port.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("extraction backend error: {0}")]
    Backend(String),
}

impl From<VectorStoreError> for EngineError {
    fn from(e: VectorStoreError) -> Self {
        match e {
            VectorStoreError::DimensionMismatch { .. } => EngineError::InputInvalid(e.to_string()),
            other => EngineError::Unavailable(other.to_string()),
        }
    }
}

impl From<LexicalStoreError> for EngineError {
    fn from(e: LexicalStoreError) -> Self {
        EngineError::Unavailable(e.to_string())
    }
}

impl From<KvError> for EngineError {
    fn from(e: KvError) -> Self {
        EngineError::Unavailable(e.to_string())
    }
}

impl From<RelationalError> for EngineError {
    fn from(e: RelationalError) -> Self {
        match e {
            RelationalError::NotFound(msg) => EngineError::NotFound(msg),
            other => EngineError::Unavailable(other.to_string()),
        }
    }
}

impl From<LlmError> for EngineError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Cancelled => EngineError::Cancelled,
            LlmError::Timeout(d) => EngineError::Timeout(d),
            other => EngineError::Retriable(other.to_string()),
        }
    }
}

impl From<EmbedError> for EngineError {
    fn from(e: EmbedError) -> Self {
        match e {
            EmbedError::DimensionMismatch { .. } => EngineError::InputInvalid(e.to_string()),
            other => EngineError::Retriable(other.to_string()),
        }
    }
}

impl From<RerankError> for EngineError {
    fn from(e: RerankError) -> Self {
        EngineError::Unavailable(e.to_string())
    }
}

impl From<ExtractError> for EngineError {
    fn from(e: ExtractError) -> Self {
        EngineError::Retriable(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;
