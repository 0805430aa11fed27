//! Process-scoped document registry
//!
//! Holds the authoritative document map, the extracted-text cache, and
//! the per-document mutexes that serialize operations on one document id.
//! Mutated only by the library manager and the ingestion pipeline.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::types::{Document, DocumentStatus};

/// Shared registry of documents and their extracted texts
#[derive(Default)]
pub struct Library {
    documents: DashMap<Uuid, Document>,
    texts: DashMap<Uuid, Arc<str>>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document
    pub fn insert(&self, document: Document) {
        self.documents.insert(document.id, document);
    }

    /// Look up a document by id
    pub fn get(&self, document_id: Uuid) -> Option<Document> {
        self.documents.get(&document_id).map(|d| d.clone())
    }

    /// Whether the document is currently registered
    pub fn contains(&self, document_id: Uuid) -> bool {
        self.documents.contains_key(&document_id)
    }

    /// All documents, newest first
    pub fn list(&self) -> Vec<Document> {
        let mut documents: Vec<Document> =
            self.documents.iter().map(|d| d.clone()).collect();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        documents
    }

    /// Remove a document and its cached text; returns the removed entry
    pub fn remove(&self, document_id: Uuid) -> Option<Document> {
        self.texts.remove(&document_id);
        self.documents.remove(&document_id).map(|(_, d)| d)
    }

    /// Current status of a document
    pub fn status(&self, document_id: Uuid) -> Option<DocumentStatus> {
        self.documents.get(&document_id).map(|d| d.status)
    }

    /// Apply a mutation to a document if it is still registered
    pub fn update<F>(&self, document_id: Uuid, f: F) -> bool
    where
        F: FnOnce(&mut Document),
    {
        match self.documents.get_mut(&document_id) {
            Some(mut entry) => {
                f(&mut entry);
                true
            }
            None => false,
        }
    }

    /// Cached extracted text for a ready document
    pub fn text(&self, document_id: Uuid) -> Option<Arc<str>> {
        self.texts.get(&document_id).map(|t| Arc::clone(&t))
    }

    /// Cache the extracted text for a document
    pub fn set_text(&self, document_id: Uuid, text: Arc<str>) {
        self.texts.insert(document_id, text);
    }

    /// Per-document mutex; operations on the same id never interleave
    pub fn lock_for(&self, document_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(document_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry for a deleted document
    pub fn release_lock(&self, document_id: Uuid) {
        self.locks.remove(&document_id);
    }
}
