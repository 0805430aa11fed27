//! In-process vector index
//!
//! Brute-force cosine scan over all records, with a document-to-chunks
//! tracking map for efficient deletion. The default backend, and the one
//! the integration tests run against.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::types::VectorRecord;

use super::index::{cosine_similarity, ScoredRecord, VectorIndexProvider};

#[derive(Default)]
struct Inner {
    records: HashMap<Uuid, VectorRecord>,
    document_chunks: HashMap<Uuid, Vec<Uuid>>,
}

/// In-memory vector index
#[derive(Default)]
pub struct MemoryIndex {
    inner: RwLock<Inner>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndexProvider for MemoryIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        let mut inner = self.inner.write();
        for record in records {
            let document_id = record.payload.document_id;
            let chunk_id = record.chunk_id;
            if inner.records.insert(chunk_id, record).is_none() {
                inner
                    .document_chunks
                    .entry(document_id)
                    .or_default()
                    .push(chunk_id);
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        document_filter: Option<&[Uuid]>,
    ) -> Result<Vec<ScoredRecord>> {
        if top_k == 0 || matches!(document_filter, Some([])) {
            return Ok(Vec::new());
        }

        let inner = self.inner.read();
        let mut results: Vec<ScoredRecord> = inner
            .records
            .values()
            .filter(|record| match document_filter {
                Some(ids) => ids.contains(&record.payload.document_id),
                None => true,
            })
            .map(|record| ScoredRecord {
                similarity: cosine_similarity(vector, &record.vector),
                record: record.clone(),
            })
            .collect();

        // Similarity descending, (document_id, chunk_index) ascending on ties
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    (a.record.payload.document_id, a.record.payload.chunk_index)
                        .cmp(&(b.record.payload.document_id, b.record.payload.chunk_index))
                })
        });
        results.truncate(top_k);

        Ok(results)
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<usize> {
        let mut inner = self.inner.write();
        let chunk_ids = inner.document_chunks.remove(&document_id).unwrap_or_default();
        let mut deleted = 0;
        for chunk_id in chunk_ids {
            if inner.records.remove(&chunk_id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn delete_chunks(&self, chunk_ids: &[Uuid]) -> Result<usize> {
        let mut inner = self.inner.write();
        let mut deleted = 0;
        for chunk_id in chunk_ids {
            if let Some(record) = inner.records.remove(chunk_id) {
                deleted += 1;
                let document_id = record.payload.document_id;
                if let Some(tracked) = inner.document_chunks.get_mut(&document_id) {
                    tracked.retain(|id| id != chunk_id);
                    if tracked.is_empty() {
                        inner.document_chunks.remove(&document_id);
                    }
                }
            }
        }
        Ok(deleted)
    }

    async fn chunk_ids(&self) -> Result<Vec<Uuid>> {
        Ok(self.inner.read().records.keys().copied().collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.inner.read().records.len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
