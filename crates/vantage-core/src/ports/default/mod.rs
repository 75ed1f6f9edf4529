//! Default port implementations, each grounded on a teacher module per
//! `DESIGN.md`.

pub mod cross_encoder_reranker;
pub mod fastembed_embedder;
pub mod hnsw_vector;
pub mod http_llm;
pub mod local_extractor;
pub mod memory_kv;
pub mod sqlite_relational;

pub use cross_encoder_reranker::CrossEncoderReranker;
pub use fastembed_embedder::FastEmbedEmbedder;
pub use hnsw_vector::HnswVectorStore;
pub use http_llm::{HttpLlm, HttpLlmConfig};
pub use local_extractor::LocalExtractor;
pub use memory_kv::InMemoryKvStore;
pub use sqlite_relational::{Fts5LexicalStore, SqliteStore};
