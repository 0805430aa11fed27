//! Library consistency manager
//!
//! Owns add, delete, and merge for the document library and keeps the
//! vector index in sync with it. Every mutation of one document id goes
//! through that document's mutex, so two operations on the same id never
//! interleave; operations on different ids proceed independently.

use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ingestion::{IngestionPipeline, JobHandle, JobInput};
use crate::providers::VectorIndexProvider;
use crate::types::{Document, DocumentStatus};

use super::registry::Library;

/// Coordinates library mutations with the pipeline and the index
pub struct LibraryManager {
    library: Arc<Library>,
    pipeline: Arc<IngestionPipeline>,
    index: Arc<dyn VectorIndexProvider>,
}

impl LibraryManager {
    pub fn new(
        library: Arc<Library>,
        pipeline: Arc<IngestionPipeline>,
        index: Arc<dyn VectorIndexProvider>,
    ) -> Self {
        Self {
            library,
            pipeline,
            index,
        }
    }

    /// The underlying registry
    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    /// Register a new document and start its ingestion job
    pub async fn add(&self, display_name: String, data: Vec<u8>) -> Result<Document> {
        if data.is_empty() {
            return Err(Error::validation("uploaded file is empty"));
        }
        if !IngestionPipeline::supports(&display_name) {
            let ext = display_name.rsplit('.').next().unwrap_or("").to_string();
            return Err(Error::UnsupportedFileType(ext));
        }

        let document = Document::new(display_name.clone(), data.len() as u64);
        let document_id = document.id;

        let lock = self.library.lock_for(document_id);
        let _guard = lock.lock().await;

        self.library.insert(document.clone());
        self.pipeline.submit(
            document_id,
            JobInput::Bytes {
                name: display_name,
                data,
            },
        );

        tracing::info!(%document_id, "document registered, ingestion started");
        Ok(document)
    }

    /// Re-submit a document's content under its existing id.
    ///
    /// Last submission wins: an in-flight job for the id is superseded and
    /// its partial records rolled back before the new job's commit.
    pub async fn resubmit(
        &self,
        document_id: Uuid,
        display_name: String,
        data: Vec<u8>,
    ) -> Result<JobHandle> {
        if data.is_empty() {
            return Err(Error::validation("uploaded file is empty"));
        }

        let lock = self.library.lock_for(document_id);
        let _guard = lock.lock().await;

        if !self.library.contains(document_id) {
            return Err(Error::DocumentNotFound(document_id.to_string()));
        }

        // Stale records from the previous submission must not survive the
        // new commit; purge what is already indexed, the superseded job
        // rolls back its own in-flight writes
        self.index.delete_by_document(document_id).await?;
        self.library.update(document_id, |doc| {
            doc.status = DocumentStatus::Pending;
            doc.byte_size = data.len() as u64;
            doc.chunk_count = 0;
            doc.error = None;
        });

        let handle = self.pipeline.submit(
            document_id,
            JobInput::Bytes {
                name: display_name,
                data,
            },
        );
        Ok(handle)
    }

    /// Remove a document and all its index records.
    ///
    /// Idempotent: deleting an absent id is not an error. Safe against a
    /// racing ingestion job: the document is removed from the registry
    /// first, the job's cancel flag is set, and only then is the index
    /// purged, so a late-arriving upsert is rolled back by the job itself.
    pub async fn delete(&self, document_id: Uuid) -> Result<()> {
        let lock = self.library.lock_for(document_id);
        let _guard = lock.lock().await;

        let existed = self.library.remove(document_id).is_some();
        self.pipeline.cancel(document_id);
        let deleted = self.index.delete_by_document(document_id).await?;

        drop(_guard);
        self.library.release_lock(document_id);

        if existed {
            tracing::info!(%document_id, deleted, "document deleted");
        }
        Ok(())
    }

    /// Merge two or more ready documents into a new one.
    ///
    /// Source texts are concatenated in caller order and re-chunked as a
    /// single new document, so overlap is recomputed across the joint.
    /// Sources are left in place; deleting them is the caller's decision.
    pub async fn merge(&self, document_ids: &[Uuid], output_name: String) -> Result<Document> {
        if document_ids.len() < 2 {
            return Err(Error::validation("merge requires at least two documents"));
        }
        let mut seen = std::collections::HashSet::new();
        if !document_ids.iter().all(|id| seen.insert(*id)) {
            return Err(Error::validation("merge document ids must be distinct"));
        }

        let mut texts = Vec::with_capacity(document_ids.len());
        for id in document_ids {
            let document = self
                .library
                .get(*id)
                .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;
            if document.status != DocumentStatus::Ready {
                return Err(Error::not_ready(format!(
                    "document {} is {}",
                    id,
                    document.status.as_str()
                )));
            }
            let text = self
                .library
                .text(*id)
                .ok_or_else(|| Error::not_ready(format!("document {} has no cached text", id)))?;
            texts.push(text);
        }

        let combined = texts
            .iter()
            .map(|t| t.as_ref())
            .collect::<Vec<_>>()
            .join("\n\n");
        let byte_size = combined.len() as u64;

        let document = Document::new(output_name, byte_size);
        let document_id = document.id;

        let lock = self.library.lock_for(document_id);
        let _guard = lock.lock().await;

        self.library.insert(document.clone());
        self.pipeline.submit(document_id, JobInput::Text(combined));

        tracing::info!(%document_id, sources = document_ids.len(), "merge submitted");
        Ok(document)
    }

    /// Current status of a document
    pub fn status(&self, document_id: Uuid) -> Result<DocumentStatus> {
        self.library
            .status(document_id)
            .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))
    }

    /// Look up a document
    pub fn get(&self, document_id: Uuid) -> Result<Document> {
        self.library
            .get(document_id)
            .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))
    }

    /// All registered documents, newest first
    pub fn documents(&self) -> Vec<Document> {
        self.library.list()
    }

    /// Full extracted text of a ready document
    pub fn document_text(&self, document_id: Uuid) -> Result<Arc<str>> {
        let document = self.get(document_id)?;
        if document.status != DocumentStatus::Ready {
            return Err(Error::not_ready(format!(
                "document {} is {}",
                document_id,
                document.status.as_str()
            )));
        }
        self.library
            .text(document_id)
            .ok_or_else(|| Error::not_ready(format!("document {} has no cached text", document_id)))
    }
}
