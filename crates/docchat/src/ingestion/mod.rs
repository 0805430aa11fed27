//! Document ingestion: extraction, chunking, and the background pipeline

pub mod chunker;
pub mod extractor;
pub mod pipeline;

pub use chunker::{ChunkSpan, TextChunker};
pub use extractor::{DocumentExtractor, ExtractedText, TextExtractor};
pub use pipeline::{IngestionPipeline, JobHandle, JobInput};
