//! Retrieval planning: query embedding, scoped index search, and
//! budget-bounded context assembly

use std::sync::Arc;
use uuid::Uuid;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::library::Library;
use crate::providers::{EmbeddingProvider, VectorIndexProvider};
use crate::types::DocumentStatus;

/// A retrieved chunk with its similarity score
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: u32,
    pub text: String,
    pub similarity: f32,
}

/// The bounded set of chunks assembled for one query; never persisted
#[derive(Debug, Clone, Default)]
pub struct RetrievalContext {
    pub chunks: Vec<ScoredChunk>,
}

impl RetrievalContext {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk texts joined for prompt assembly
    pub fn context_text(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Plans and executes retrieval for one query
pub struct RetrievalPlanner {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    library: Arc<Library>,
    config: RetrievalConfig,
}

impl RetrievalPlanner {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
        library: Arc<Library>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            library,
            config,
        }
    }

    /// Retrieve a context for `query` over the candidate documents.
    ///
    /// An empty candidate set yields an empty context; it is an explicit
    /// scope, not a request for all documents. Candidates that are not
    /// ready are silently excluded. Chunks are packed whole, in rank
    /// order, until the character budget is exhausted; a chunk is never
    /// truncated mid-text.
    pub async fn retrieve(&self, query: &str, candidate_ids: &[Uuid]) -> Result<RetrievalContext> {
        self.retrieve_with(
            query,
            candidate_ids,
            self.config.top_k,
            self.config.context_budget_chars,
        )
        .await
    }

    /// `retrieve` with explicit `top_k` and budget
    pub async fn retrieve_with(
        &self,
        query: &str,
        candidate_ids: &[Uuid],
        top_k: usize,
        budget_chars: usize,
    ) -> Result<RetrievalContext> {
        let ready_ids: Vec<Uuid> = candidate_ids
            .iter()
            .copied()
            .filter(|id| self.library.status(*id) == Some(DocumentStatus::Ready))
            .collect();

        if ready_ids.is_empty() {
            return Ok(RetrievalContext::default());
        }

        let query_vector = self.embedder.embed(query).await?;
        let mut scored = self
            .index
            .query(&query_vector, top_k, Some(&ready_ids))
            .await?;

        // Deterministic order regardless of backend: similarity descending,
        // ties by (document_id, chunk_index) ascending
        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    (a.record.payload.document_id, a.record.payload.chunk_index)
                        .cmp(&(b.record.payload.document_id, b.record.payload.chunk_index))
                })
        });

        let mut chunks = Vec::new();
        let mut used = 0usize;
        for hit in scored {
            let len = hit.record.payload.text.len();
            if used + len > budget_chars {
                continue;
            }
            used += len;
            chunks.push(ScoredChunk {
                chunk_id: hit.record.chunk_id,
                document_id: hit.record.payload.document_id,
                chunk_index: hit.record.payload.chunk_index,
                text: hit.record.payload.text,
                similarity: hit.similarity,
            });
        }

        tracing::debug!(
            candidates = candidate_ids.len(),
            ready = ready_ids.len(),
            retrieved = chunks.len(),
            "retrieval complete"
        );

        Ok(RetrievalContext { chunks })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::providers::MemoryIndex;
    use crate::types::{Chunk, Document, VectorRecord};
    use async_trait::async_trait;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        fn dimensions(&self) -> usize {
            self.0.len()
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn ready_document(library: &Library, name: &str) -> Uuid {
        let mut doc = Document::new(name.to_string(), 1);
        doc.status = DocumentStatus::Ready;
        let id = doc.id;
        library.insert(doc);
        id
    }

    async fn seed(index: &MemoryIndex, doc: Uuid, chunk_index: u32, text: &str, vector: Vec<f32>) {
        let chunk = Chunk::new(doc, chunk_index, text.to_string(), 0, text.len());
        index
            .upsert(vec![VectorRecord::from_chunk(&chunk, vector)])
            .await
            .unwrap();
    }

    fn planner(
        index: Arc<MemoryIndex>,
        library: Arc<Library>,
        query_vector: Vec<f32>,
    ) -> RetrievalPlanner {
        RetrievalPlanner::new(
            Arc::new(FixedEmbedder(query_vector)),
            index,
            library,
            RetrievalConfig::default(),
        )
    }

    #[tokio::test]
    async fn empty_candidate_set_yields_empty_context() {
        let index = Arc::new(MemoryIndex::new());
        let library = Arc::new(Library::new());
        let doc = ready_document(&library, "a.txt");
        seed(&index, doc, 0, "text", vec![1.0, 0.0]).await;

        let planner = planner(index, library, vec![1.0, 0.0]);
        let context = planner.retrieve("query", &[]).await.unwrap();
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn non_ready_candidates_are_excluded() {
        let index = Arc::new(MemoryIndex::new());
        let library = Arc::new(Library::new());

        let ready = ready_document(&library, "ready.txt");
        let pending = Document::new("pending.txt".to_string(), 1);
        let pending_id = pending.id;
        library.insert(pending);

        seed(&index, ready, 0, "ready chunk", vec![1.0, 0.0]).await;
        seed(&index, pending_id, 0, "pending chunk", vec![1.0, 0.0]).await;

        let planner = planner(index, library, vec![1.0, 0.0]);
        let context = planner
            .retrieve("query", &[ready, pending_id])
            .await
            .unwrap();
        assert_eq!(context.chunks.len(), 1);
        assert_eq!(context.chunks[0].document_id, ready);
    }

    #[tokio::test]
    async fn unknown_candidate_yields_empty_context() {
        let index = Arc::new(MemoryIndex::new());
        let library = Arc::new(Library::new());
        let planner = planner(index, library, vec![1.0]);

        let context = planner.retrieve("query", &[Uuid::new_v4()]).await.unwrap();
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn budget_drops_whole_chunks() {
        let index = Arc::new(MemoryIndex::new());
        let library = Arc::new(Library::new());
        let doc = ready_document(&library, "a.txt");

        seed(&index, doc, 0, "aaaaaaaaaa", vec![1.0, 0.0]).await;
        seed(&index, doc, 1, "bbbbbbbbbbbbbbbbbbbb", vec![0.9, 0.1]).await;
        seed(&index, doc, 2, "cccc", vec![0.8, 0.2]).await;

        let planner = planner(index, library, vec![1.0, 0.0]);
        // Budget fits chunk 0 and chunk 2, but not chunk 1
        let context = planner.retrieve_with("query", &[doc], 10, 15).await.unwrap();
        let indices: Vec<u32> = context.chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 2]);
        for chunk in &context.chunks {
            assert!(!chunk.text.is_empty());
        }
    }

    #[tokio::test]
    async fn repeated_retrieval_is_deterministic() {
        let index = Arc::new(MemoryIndex::new());
        let library = Arc::new(Library::new());
        let doc_a = ready_document(&library, "a.txt");
        let doc_b = ready_document(&library, "b.txt");

        // Identical vectors force tie-breaking
        seed(&index, doc_b, 1, "b1", vec![1.0, 0.0]).await;
        seed(&index, doc_a, 0, "a0", vec![1.0, 0.0]).await;
        seed(&index, doc_b, 0, "b0", vec![1.0, 0.0]).await;

        let planner = planner(index, library, vec![1.0, 0.0]);
        let first = planner.retrieve("query", &[doc_a, doc_b]).await.unwrap();
        let second = planner.retrieve("query", &[doc_a, doc_b]).await.unwrap();

        let order = |ctx: &RetrievalContext| {
            ctx.chunks
                .iter()
                .map(|c| (c.document_id, c.chunk_index))
                .collect::<Vec<_>>()
        };
        assert_eq!(order(&first), order(&second));

        let mut expected = vec![(doc_a, 0), (doc_b, 0), (doc_b, 1)];
        expected.sort();
        assert_eq!(order(&first), expected);
    }

    #[test]
    fn context_text_joins_chunks() {
        let context = RetrievalContext {
            chunks: vec![
                ScoredChunk {
                    chunk_id: Uuid::new_v4(),
                    document_id: Uuid::new_v4(),
                    chunk_index: 0,
                    text: "first".to_string(),
                    similarity: 1.0,
                },
                ScoredChunk {
                    chunk_id: Uuid::new_v4(),
                    document_id: Uuid::new_v4(),
                    chunk_index: 1,
                    text: "second".to_string(),
                    similarity: 0.5,
                },
            ],
        };
        assert_eq!(context.context_text(), "first\n\nsecond");
    }
}
