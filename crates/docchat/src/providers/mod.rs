//! Capability provider traits and implementations

pub mod embedding;
pub mod index;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod qdrant;

pub use embedding::EmbeddingProvider;
pub use index::{ScoredRecord, VectorIndexProvider};
pub use llm::{CompletionStream, LlmProvider};
pub use memory::MemoryIndex;
pub use ollama::OllamaClient;
pub use qdrant::QdrantIndex;
