//! docchat: streaming RAG chat over uploaded documents
//!
//! Upload documents, ask questions grounded in their content, and get
//! token-streamed answers. The crate covers the full pipeline: text
//! extraction and chunking, background embedding jobs, a consistent
//! document library with add/merge/delete, scoped vector retrieval, and
//! a streaming generation protocol with a single-terminal-event
//! guarantee.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod library;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::{GenerationStreamer, PromptBuilder, StreamEvent};
pub use ingestion::{IngestionPipeline, TextChunker};
pub use library::{Library, LibraryManager};
pub use retrieval::{RetrievalContext, RetrievalPlanner};
pub use types::{Chunk, ChatMessage, Document, DocumentStatus, VectorRecord};
