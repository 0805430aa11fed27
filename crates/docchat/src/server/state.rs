//! Application state for the chat server

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{IndexBackend, RagConfig};
use crate::error::Result;
use crate::generation::GenerationStreamer;
use crate::ingestion::IngestionPipeline;
use crate::library::{Library, LibraryManager};
use crate::providers::{
    EmbeddingProvider, LlmProvider, MemoryIndex, OllamaClient, QdrantIndex, VectorIndexProvider,
};
use crate::retrieval::RetrievalPlanner;
use crate::storage::SessionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    manager: Arc<LibraryManager>,
    planner: Arc<RetrievalPlanner>,
    streamer: Arc<GenerationStreamer>,
    llm: Arc<dyn LlmProvider>,
    sessions: Arc<SessionStore>,
    ready: RwLock<bool>,
}

impl AppState {
    /// Create application state from configuration
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing application state");

        let ollama = Arc::new(OllamaClient::new(
            &config.llm,
            config.embeddings.dimensions,
        )?);
        let embedder: Arc<dyn EmbeddingProvider> = Arc::clone(&ollama) as _;
        let llm: Arc<dyn LlmProvider> = Arc::clone(&ollama) as _;

        let index: Arc<dyn VectorIndexProvider> = match config.index.backend {
            IndexBackend::Memory => {
                tracing::info!("Using in-memory vector index");
                Arc::new(MemoryIndex::new())
            }
            IndexBackend::Qdrant => {
                tracing::info!(url = %config.index.qdrant_url, "Using Qdrant vector index");
                let qdrant = QdrantIndex::new(&config.index, config.embeddings.dimensions)?;
                qdrant.ensure_collection().await?;
                Arc::new(qdrant)
            }
        };

        let sessions = Arc::new(SessionStore::open(&config.session.db_path)?);

        Ok(Self::assemble(config, embedder, llm, index, sessions))
    }

    /// Build state from explicit providers; used by tests with mocks
    pub fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn VectorIndexProvider>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self::assemble(config, embedder, llm, index, sessions)
    }

    fn assemble(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        index: Arc<dyn VectorIndexProvider>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        let library = Arc::new(Library::new());
        let pipeline = Arc::new(IngestionPipeline::new(
            &config.chunking,
            &config.processing,
            Arc::clone(&embedder),
            Arc::clone(&index),
            Arc::clone(&library),
        ));
        let manager = Arc::new(LibraryManager::new(
            Arc::clone(&library),
            Arc::clone(&pipeline),
            Arc::clone(&index),
        ));
        let planner = Arc::new(RetrievalPlanner::new(
            Arc::clone(&embedder),
            Arc::clone(&index),
            Arc::clone(&library),
            config.retrieval.clone(),
        ));
        let streamer = Arc::new(GenerationStreamer::new(
            Arc::clone(&llm),
            Duration::from_secs(config.processing.stream_timeout_secs),
        ));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                manager,
                planner,
                streamer,
                llm,
                sessions,
                ready: RwLock::new(true),
            }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn manager(&self) -> &Arc<LibraryManager> {
        &self.inner.manager
    }

    pub fn planner(&self) -> &Arc<RetrievalPlanner> {
        &self.inner.planner
    }

    pub fn streamer(&self) -> &Arc<GenerationStreamer> {
        &self.inner.streamer
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.inner.sessions
    }

    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
