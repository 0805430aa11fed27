//! Background ingestion pipeline
//!
//! One cancellable background job per document id: extract, chunk, embed
//! each chunk, upsert into the index, then commit the document as ready.
//! A newer submission for the same id supersedes the older job. Any
//! failure or cancellation rolls back the records this job has already
//! written, so a partial index is never left behind a `ready` status.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use uuid::Uuid;

use crate::config::{ChunkingConfig, ProcessingConfig};
use crate::error::Error;
use crate::library::Library;
use crate::providers::{EmbeddingProvider, VectorIndexProvider};
use crate::types::{Chunk, DocumentStatus, VectorRecord};

use super::chunker::TextChunker;
use super::extractor::{DocumentExtractor, ExtractedText, TextExtractor};

/// What a job starts from
pub enum JobInput {
    /// Raw upload bytes, extracted inside the job
    Bytes { name: String, data: Vec<u8> },
    /// Already-extracted text (merge re-submission)
    Text(String),
}

/// Handle returned by `submit`
#[derive(Debug, Clone, Copy)]
pub struct JobHandle {
    pub document_id: Uuid,
    pub generation: u64,
}

struct JobEntry {
    generation: u64,
    cancel: Arc<AtomicBool>,
}

/// Runs ingestion jobs and keeps the at-most-one-job-per-document rule
pub struct IngestionPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    library: Arc<Library>,
    jobs: DashMap<Uuid, JobEntry>,
    next_generation: AtomicU64,
    config: ProcessingConfig,
}

impl IngestionPipeline {
    pub fn new(
        chunking: &ChunkingConfig,
        processing: &ProcessingConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
        library: Arc<Library>,
    ) -> Self {
        Self {
            chunker: TextChunker::new(
                chunking.chunk_size,
                chunking.chunk_overlap,
                chunking.min_chunk_size,
            ),
            embedder,
            index,
            library,
            jobs: DashMap::new(),
            next_generation: AtomicU64::new(1),
            config: processing.clone(),
        }
    }

    /// Submit an ingestion job; returns immediately.
    ///
    /// A job already in flight for this document id is superseded: its
    /// cancel flag is set and its rollback runs on its own task.
    pub fn submit(self: &Arc<Self>, document_id: Uuid, input: JobInput) -> JobHandle {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let cancel = Arc::new(AtomicBool::new(false));

        if let Some(stale) = self.jobs.insert(
            document_id,
            JobEntry {
                generation,
                cancel: Arc::clone(&cancel),
            },
        ) {
            tracing::info!(%document_id, stale_generation = stale.generation, "superseding in-flight ingestion job");
            stale.cancel.store(true, Ordering::SeqCst);
        }

        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            pipeline.run_job(document_id, generation, cancel, input).await;
        });

        JobHandle {
            document_id,
            generation,
        }
    }

    /// Cancel the in-flight job for a document, if any.
    ///
    /// The job notices at its next cancellation check and rolls back the
    /// records it has written.
    pub fn cancel(&self, document_id: Uuid) -> bool {
        match self.jobs.get(&document_id) {
            Some(entry) => {
                entry.cancel.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Whether a job is currently registered for this document
    pub fn has_job(&self, document_id: Uuid) -> bool {
        self.jobs.contains_key(&document_id)
    }

    async fn run_job(
        &self,
        document_id: Uuid,
        generation: u64,
        cancel: Arc<AtomicBool>,
        input: JobInput,
    ) {
        let deadline = Instant::now() + Duration::from_secs(self.config.job_timeout_secs);
        let mut written: Vec<Uuid> = Vec::new();

        // The wall-clock budget bounds the whole job, so no single hung
        // collaborator call can leave the document embedding forever
        let result = match timeout_at(
            deadline,
            self.process(document_id, generation, &cancel, input, &mut written),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(JobAbort::Failed(Error::internal("ingestion job timed out"))),
        };

        match result {
            Ok(()) => {
                self.finish_job(document_id, generation);
            }
            Err(JobAbort::Cancelled) => {
                tracing::info!(%document_id, generation, "ingestion job cancelled");
                self.rollback(document_id, &written).await;
                self.finish_job(document_id, generation);
            }
            Err(JobAbort::Failed(error)) => {
                tracing::warn!(%document_id, generation, "ingestion job failed: {}", error);
                self.rollback(document_id, &written).await;
                self.mark_failed(document_id, generation, &cancel, error).await;
                self.finish_job(document_id, generation);
            }
        }
    }

    async fn process(
        &self,
        document_id: Uuid,
        generation: u64,
        cancel: &AtomicBool,
        input: JobInput,
        written: &mut Vec<Uuid>,
    ) -> std::result::Result<(), JobAbort> {
        check_cancel(cancel)?;

        if !self
            .library
            .update(document_id, |doc| doc.status = DocumentStatus::Embedding)
        {
            // Deleted before the job started
            return Err(JobAbort::Cancelled);
        }

        let extracted = self.extract(input).await?;
        check_cancel(cancel)?;

        let full_text = TextChunker::join_pages(&extracted.pages);
        let content_hash = hash_text(&full_text);
        let spans = self.chunker.chunk(&extracted.pages);
        if spans.is_empty() {
            return Err(JobAbort::Failed(Error::validation(
                "document produced no chunks",
            )));
        }

        let chunks: Vec<Chunk> = spans
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                Chunk::new(document_id, i as u32, span.text, span.char_start, span.char_end)
            })
            .collect();
        let chunk_count = chunks.len() as u32;

        for chunk in &chunks {
            check_cancel(cancel)?;

            let embed_budget = Duration::from_secs(self.config.embed_timeout_secs);
            let vector = timeout(embed_budget, self.embedder.embed(&chunk.text))
                .await
                .map_err(|_| JobAbort::Failed(Error::embedding("embedding call timed out")))?
                .map_err(JobAbort::Failed)?;

            check_cancel(cancel)?;

            let record = VectorRecord::from_chunk(chunk, vector);
            self.index
                .upsert(vec![record])
                .await
                .map_err(JobAbort::Failed)?;
            written.push(chunk.id);
        }

        // Commit under the per-document lock so a concurrent delete or
        // supersede cannot interleave with the status change
        let lock = self.library.lock_for(document_id);
        let _guard = lock.lock().await;

        check_cancel(cancel)?;
        let still_current = self
            .jobs
            .get(&document_id)
            .map(|entry| entry.generation == generation)
            .unwrap_or(false);
        if !still_current {
            return Err(JobAbort::Cancelled);
        }

        let committed = self.library.update(document_id, |doc| {
            doc.status = DocumentStatus::Ready;
            doc.chunk_count = chunk_count;
            doc.page_count = Some(extracted.page_count);
            doc.content_hash = content_hash.clone();
            doc.error = None;
        });
        if !committed {
            return Err(JobAbort::Cancelled);
        }

        self.library.set_text(document_id, Arc::from(full_text));
        tracing::info!(%document_id, chunk_count, "document ready");
        Ok(())
    }

    async fn extract(&self, input: JobInput) -> std::result::Result<ExtractedText, JobAbort> {
        match input {
            JobInput::Text(text) => Ok(ExtractedText {
                pages: vec![text],
                page_count: 1,
            }),
            JobInput::Bytes { name, data } => {
                let extractor = DocumentExtractor::new();
                let handle =
                    tokio::task::spawn_blocking(move || extractor.extract(&name, &data));
                match handle.await {
                    Ok(result) => result.map_err(JobAbort::Failed),
                    Err(join_error) => Err(JobAbort::Failed(Error::internal(format!(
                        "extraction task panicked: {}",
                        join_error
                    )))),
                }
            }
        }
    }

    /// Compensating deletes for the records this job wrote
    async fn rollback(&self, document_id: Uuid, written: &[Uuid]) {
        if written.is_empty() {
            return;
        }
        match self.index.delete_chunks(written).await {
            Ok(deleted) => {
                tracing::debug!(%document_id, deleted, "rolled back partial index records")
            }
            Err(error) => {
                tracing::error!(%document_id, "rollback of partial records failed: {}", error)
            }
        }
    }

    async fn mark_failed(
        &self,
        document_id: Uuid,
        generation: u64,
        cancel: &AtomicBool,
        error: Error,
    ) {
        let lock = self.library.lock_for(document_id);
        let _guard = lock.lock().await;

        // A superseding job or a delete owns the document now
        let still_current = self
            .jobs
            .get(&document_id)
            .map(|entry| entry.generation == generation)
            .unwrap_or(false);
        if !still_current || cancel.load(Ordering::SeqCst) {
            return;
        }

        self.library.update(document_id, |doc| {
            doc.status = DocumentStatus::Failed;
            doc.error = Some(error.to_string());
        });
    }

    fn finish_job(&self, document_id: Uuid, generation: u64) {
        self.jobs
            .remove_if(&document_id, |_, entry| entry.generation == generation);
    }

    /// Whether the file name is an ingestible type
    pub fn supports(name: &str) -> bool {
        DocumentExtractor::supports(name)
    }

    /// Chunk already-extracted text with this pipeline's parameters
    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }
}

enum JobAbort {
    Cancelled,
    Failed(Error),
}

fn check_cancel(cancel: &AtomicBool) -> std::result::Result<(), JobAbort> {
    if cancel.load(Ordering::SeqCst) {
        Err(JobAbort::Cancelled)
    } else {
        Ok(())
    }
}

fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
