//! Default vector-store port: USearch HNSW index.
//!
//! Grounded directly on `search/vector.rs`'s `VectorIndex` (reserve-before-add
//! discipline, string-key ↔ u64-id map, cosine metric), wrapped behind the
//! [`VectorStore`] trait with the HNSW parameters of spec §6.3
//! (`m=24, ef_construction=128, ef_search=100`).

use crate::data::Document;
use crate::error::VectorStoreError;
use crate::ports::{Filters, VectorHit, VectorStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

pub struct HnswVectorStore {
    index: Mutex<Index>,
    key_to_id: Mutex<HashMap<String, u64>>,
    id_to_key: Mutex<HashMap<u64, String>>,
    next_id: Mutex<u64>,
    dim: usize,
}

impl HnswVectorStore {
    pub fn new(dim: usize, m: usize, ef_construction: usize, ef_search: usize) -> Result<Self, VectorStoreError> {
        let options = IndexOptions {
            dimensions: dim,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: m,
            expansion_add: ef_construction,
            expansion_search: ef_search,
            multi: false,
        };
        let index = Index::new(&options).map_err(|e| VectorStoreError::Backend(e.to_string()))?;
        Ok(Self {
            index: Mutex::new(index),
            key_to_id: Mutex::new(HashMap::new()),
            id_to_key: Mutex::new(HashMap::new()),
            next_id: Mutex::new(0),
            dim,
        })
    }

    fn ensure_capacity(&self, index: &Index) -> Result<(), VectorStoreError> {
        let size = index.size();
        let capacity = index.capacity();
        if size >= capacity {
            let new_capacity = std::cmp::max(capacity * 2, 16);
            index.reserve(new_capacity).map_err(|e| VectorStoreError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for HnswVectorStore {
    async fn upsert(&self, doc: &Document) -> Result<(), VectorStoreError> {
        if doc.embedding.len() != self.dim {
            return Err(VectorStoreError::DimensionMismatch { expected: self.dim, actual: doc.embedding.len() });
        }
        let index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        let mut key_to_id = self.key_to_id.lock().unwrap_or_else(|e| e.into_inner());
        let mut id_to_key = self.id_to_key.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(&existing_id) = key_to_id.get(&doc.id) {
            index.remove(existing_id).map_err(|e| VectorStoreError::Backend(e.to_string()))?;
            self.ensure_capacity(&index)?;
            index.add(existing_id, &doc.embedding).map_err(|e| VectorStoreError::Backend(e.to_string()))?;
            return Ok(());
        }

        self.ensure_capacity(&index)?;
        let mut next_id = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
        let id = *next_id;
        *next_id += 1;
        index.add(id, &doc.embedding).map_err(|e| VectorStoreError::Backend(e.to_string()))?;
        key_to_id.insert(doc.id.clone(), id);
        id_to_key.insert(id, doc.id.clone());
        Ok(())
    }

    async fn delete(&self, doc_id: &str) -> Result<(), VectorStoreError> {
        let index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        let mut key_to_id = self.key_to_id.lock().unwrap_or_else(|e| e.into_inner());
        let mut id_to_key = self.id_to_key.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(id) = key_to_id.remove(doc_id) {
            id_to_key.remove(&id);
            index.remove(id).map_err(|e| VectorStoreError::Backend(e.to_string()))?;
        }
        Ok(())
    }

    async fn knn(&self, query: &[f32], k: usize, _filters: &Filters) -> Result<Vec<VectorHit>, VectorStoreError> {
        if query.len() != self.dim {
            return Err(VectorStoreError::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        if index.size() == 0 {
            return Ok(Vec::new());
        }
        let matches = index.search(query, k).map_err(|e| VectorStoreError::Backend(e.to_string()))?;
        let id_to_key = self.id_to_key.lock().unwrap_or_else(|e| e.into_inner());
        let mut hits = Vec::with_capacity(matches.keys.len());
        for (key, distance) in matches.keys.iter().zip(matches.distances.iter()) {
            if let Some(doc_id) = id_to_key.get(key) {
                // usearch cosine metric returns a distance in [0,2]; convert to a similarity score in [0,1].
                hits.push(VectorHit { doc_id: doc_id.clone(), score: 1.0 - (*distance / 2.0) });
            }
        }
        Ok(hits)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn doc(id: &str, embedding: Vec<f32>) -> Document {
        Document {
            id: id.to_string(),
            filename: format!("{id}.txt"),
            path: format!("/tmp/{id}"),
            file_type: "txt".into(),
            doc_type: "note".into(),
            summary: String::new(),
            detailed_summary: String::new(),
            keywords: BTreeSet::new(),
            entities: BTreeSet::new(),
            topics: BTreeSet::new(),
            full_content: String::new(),
            embedding,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            file_size: 0,
            page_count: None,
            author: None,
            partial_index: false,
        }
    }

    #[tokio::test]
    async fn knn_returns_nearest_by_cosine() {
        let store = HnswVectorStore::new(4, 16, 64, 64).unwrap();
        store.upsert(&doc("a", vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        store.upsert(&doc("b", vec![0.0, 1.0, 0.0, 0.0])).await.unwrap();
        let hits = store.knn(&[0.9, 0.1, 0.0, 0.0], 2, &Filters::new()).await.unwrap();
        assert_eq!(hits[0].doc_id, "a");
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let store = HnswVectorStore::new(4, 16, 64, 64).unwrap();
        let err = store.upsert(&doc("a", vec![1.0, 0.0])).await.unwrap_err();
        assert!(matches!(err, VectorStoreError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn delete_removes_from_future_knn_results() {
        let store = HnswVectorStore::new(4, 16, 64, 64).unwrap();
        store.upsert(&doc("a", vec![1.0, 0.0, 0.0, 0.0])).await.unwrap();
        store.delete("a").await.unwrap();
        let hits = store.knn(&[1.0, 0.0, 0.0, 0.0], 5, &Filters::new()).await.unwrap();
        assert!(hits.is_empty());
    }
}
