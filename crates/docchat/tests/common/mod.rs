//! Shared test fixtures: in-process providers and a full pipeline stack
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use docchat::config::{ChunkingConfig, ProcessingConfig, RetrievalConfig};
use docchat::error::Result;
use docchat::generation::GenerationStreamer;
use docchat::ingestion::IngestionPipeline;
use docchat::library::{Library, LibraryManager};
use docchat::providers::{
    CompletionStream, EmbeddingProvider, LlmProvider, MemoryIndex, VectorIndexProvider,
};
use docchat::retrieval::RetrievalPlanner;
use docchat::types::DocumentStatus;

pub const DIMS: usize = 8;

/// Deterministic embedder: a byte histogram folded into 8 dimensions.
/// Similar texts get similar vectors, which is enough for retrieval
/// tests without a model.
pub struct HashEmbedder {
    delay: Duration,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
        }
    }

    /// Embedder that sleeps per call, to hold ingestion jobs in flight
    pub fn slow(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut vector = vec![0.0f32; DIMS];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % DIMS] += byte as f32 / 255.0;
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// LLM that streams a canned answer word by word
pub struct ScriptedLlm {
    pub answer: String,
}

impl ScriptedLlm {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.answer.clone())
    }

    async fn stream_completion(&self, _prompt: &str) -> Result<CompletionStream> {
        use futures::StreamExt;
        let words: Vec<Result<String>> = self
            .answer
            .split_inclusive(' ')
            .map(|w| Ok(w.to_string()))
            .collect();
        Ok(futures::stream::iter(words).boxed())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// A fully wired in-process stack over the memory index
pub struct TestStack {
    pub library: Arc<Library>,
    pub index: Arc<MemoryIndex>,
    pub pipeline: Arc<IngestionPipeline>,
    pub manager: Arc<LibraryManager>,
    pub planner: Arc<RetrievalPlanner>,
    pub streamer: Arc<GenerationStreamer>,
}

pub fn stack() -> TestStack {
    stack_with_embedder(Arc::new(HashEmbedder::new()))
}

pub fn stack_with_embedder(embedder: Arc<dyn EmbeddingProvider>) -> TestStack {
    let chunking = ChunkingConfig {
        chunk_size: 80,
        chunk_overlap: 10,
        min_chunk_size: 0,
    };
    let processing = ProcessingConfig {
        job_timeout_secs: 30,
        embed_timeout_secs: 10,
        stream_timeout_secs: 10,
    };

    let library = Arc::new(Library::new());
    let index = Arc::new(MemoryIndex::new());
    let index_dyn: Arc<dyn VectorIndexProvider> = Arc::clone(&index) as _;

    let pipeline = Arc::new(IngestionPipeline::new(
        &chunking,
        &processing,
        Arc::clone(&embedder),
        Arc::clone(&index_dyn),
        Arc::clone(&library),
    ));
    let manager = Arc::new(LibraryManager::new(
        Arc::clone(&library),
        Arc::clone(&pipeline),
        Arc::clone(&index_dyn),
    ));
    let planner = Arc::new(RetrievalPlanner::new(
        embedder,
        Arc::clone(&index_dyn),
        Arc::clone(&library),
        RetrievalConfig {
            top_k: 16,
            context_budget_chars: 10_000,
            history_messages: 6,
        },
    ));
    let streamer = Arc::new(GenerationStreamer::new(
        Arc::new(ScriptedLlm::new("The answer is X. ")),
        Duration::from_secs(10),
    ));

    TestStack {
        library,
        index,
        pipeline,
        manager,
        planner,
        streamer,
    }
}

/// Poll until the document reaches a terminal status
pub async fn wait_settled(manager: &LibraryManager, document_id: Uuid) -> DocumentStatus {
    for _ in 0..500 {
        match manager.status(document_id) {
            Ok(DocumentStatus::Ready) => return DocumentStatus::Ready,
            Ok(DocumentStatus::Failed) => return DocumentStatus::Failed,
            Ok(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            Err(_) => panic!("document {} disappeared while waiting", document_id),
        }
    }
    panic!("document {} never settled", document_id);
}

/// Map every indexed chunk id to its owning document id
pub async fn index_ownership(index: &MemoryIndex) -> HashMap<Uuid, Uuid> {
    let query = vec![0.0f32; DIMS];
    index
        .query(&query, usize::MAX, None)
        .await
        .expect("index query")
        .into_iter()
        .map(|hit| (hit.record.chunk_id, hit.record.payload.document_id))
        .collect()
}

/// Assert I1/I3: the index holds exactly the chunks of ready documents
pub async fn assert_index_consistent(library: &Library, index: &MemoryIndex) {
    let ownership = index_ownership(index).await;

    let ready: HashMap<Uuid, u32> = library
        .list()
        .into_iter()
        .filter(|d| d.status == DocumentStatus::Ready)
        .map(|d| (d.id, d.chunk_count))
        .collect();

    for (chunk_id, document_id) in &ownership {
        assert!(
            ready.contains_key(document_id),
            "chunk {} belongs to non-ready document {}",
            chunk_id,
            document_id
        );
    }

    for (document_id, chunk_count) in &ready {
        let owned = ownership
            .values()
            .filter(|owner| *owner == document_id)
            .count();
        assert_eq!(
            owned as u32, *chunk_count,
            "document {} owns {} indexed chunks, expected {}",
            document_id, owned, chunk_count
        );
    }
}
