//! Document, chunk, and vector record types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a document in the library
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Accepted, ingestion not yet started
    Pending,
    /// Background embedding job in flight
    Embedding,
    /// All chunks committed to the index, queryable
    Ready,
    /// Ingestion failed; partial records have been rolled back
    Failed,
}

impl DocumentStatus {
    /// Label used in status responses and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Embedding => "embedding",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

/// A document registered in the library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Display name as uploaded (or chosen for a merge result)
    pub display_name: String,
    /// Size of the uploaded bytes
    pub byte_size: u64,
    /// Current lifecycle status
    pub status: DocumentStatus,
    /// Number of extracted pages, once known
    pub page_count: Option<u32>,
    /// Number of chunks committed to the index (0 until ready)
    pub chunk_count: u32,
    /// Content hash of the extracted text, for diagnostics and dedup
    pub content_hash: String,
    /// Upload timestamp
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    /// Failure message when status is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Document {
    /// Create a new pending document
    pub fn new(display_name: String, byte_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name,
            byte_size,
            status: DocumentStatus::Pending,
            page_count: None,
            chunk_count: 0,
            content_hash: String::new(),
            uploaded_at: chrono::Utc::now(),
            error: None,
        }
    }
}

/// A chunk of document text, the unit of embedding and retrieval.
///
/// Immutable once created; `chunk_index` ordering is document order,
/// not relevance order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Position within the document
    pub chunk_index: u32,
    /// Text content
    pub text: String,
    /// Character offsets into the document's joined page text
    pub char_start: usize,
    pub char_end: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(
        document_id: Uuid,
        chunk_index: u32,
        text: String,
        char_start: usize,
        char_end: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            chunk_index,
            text,
            char_start,
            char_end,
        }
    }
}

/// Payload stored alongside each vector in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayload {
    pub document_id: Uuid,
    pub chunk_index: u32,
    pub text: String,
}

/// An entry in the vector index.
///
/// Constructed only by the ingestion pipeline and the library manager;
/// owned by the index adapter once upserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Chunk ID, used as the point ID in the index
    pub chunk_id: Uuid,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Retrieval payload
    pub payload: RecordPayload,
}

impl VectorRecord {
    /// Build a record from an embedded chunk
    pub fn from_chunk(chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            chunk_id: chunk.id,
            vector,
            payload: RecordPayload {
                document_id: chunk.document_id,
                chunk_index: chunk.chunk_index,
                text: chunk.text.clone(),
            },
        }
    }
}
