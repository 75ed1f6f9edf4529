//! Document ingestion (spec §4.3): discovery, extraction, normalization,
//! summarization, embedding and graph update, composed into a bounded
//! worker-pool pipeline with a file-watcher front end and a durable retry
//! queue for relational-store failures.

pub mod discovery;
pub mod extract;
pub mod graph_update;
pub mod normalize;
pub mod pipeline;
pub mod queue;
pub mod summarize;
pub mod watcher;

pub use pipeline::{FileStatus, IngestionPipeline, IngestionProgress, IngestionReport};
pub use queue::RetryQueue;
pub use watcher::{FileWatcher, WatchEvent};
