//! Discovery stage (spec §4.3 stage 1): walk a directory tree, keeping
//! files whose extension is allow-listed and skipping hidden files,
//! oversized files, and symlink loops.

use crate::config::IngestConfig;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file accepted by the allow-list/size/hidden-name filters, not yet
/// checked against the idempotence index.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    pub file_type: String,
    pub file_size: u64,
}

fn is_hidden(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()).map(|n| n.starts_with('.')).unwrap_or(false)
}

/// Walk `root` (bounded depth guards against symlink cycles; `WalkDir`
/// does not follow symlinks by default, which is what keeps the walk
/// finite per spec §4.3 stage 1).
pub fn discover(root: &Path, config: &IngestConfig) -> Vec<DiscoveredFile> {
    if root.is_file() {
        return discover_one(root, config).into_iter().collect();
    }

    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| discover_one(entry.path(), config))
        .collect()
}

fn discover_one(path: &Path, config: &IngestConfig) -> Option<DiscoveredFile> {
    if is_hidden(path) {
        return None;
    }
    let ext = path.extension()?.to_str()?.to_lowercase();
    if !config.allowed_extensions.iter().any(|allowed| allowed == &ext) {
        return None;
    }
    let metadata = std::fs::metadata(path).ok()?;
    if metadata.len() > config.max_file_bytes {
        return None;
    }
    Some(DiscoveredFile { path: path.to_path_buf(), file_type: ext, file_size: metadata.len() })
}
