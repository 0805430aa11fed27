//! Vector index provider trait

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::VectorRecord;

/// A record returned from a similarity query
#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: VectorRecord,
    /// Similarity score, higher is better
    pub similarity: f32,
}

/// Capability: upsert/query/delete vectors keyed by chunk id
#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Insert or replace records
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Query nearest neighbors, optionally restricted to a document set.
    /// `Some(&[])` matches nothing; `None` searches all documents.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        document_filter: Option<&[Uuid]>,
    ) -> Result<Vec<ScoredRecord>>;

    /// Remove all records for a document; returns how many were removed
    async fn delete_by_document(&self, document_id: Uuid) -> Result<usize>;

    /// Remove specific chunks; returns how many were removed
    async fn delete_chunks(&self, chunk_ids: &[Uuid]) -> Result<usize>;

    /// All chunk ids currently present
    async fn chunk_ids(&self) -> Result<Vec<Uuid>>;

    /// Number of records in the index
    async fn len(&self) -> Result<usize>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Cosine similarity between two vectors of equal length
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.3, 0.5, 0.1];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }
}
