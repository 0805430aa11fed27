//! Qdrant vector index over plain HTTP

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::types::document::RecordPayload;
use crate::types::VectorRecord;

use super::index::{ScoredRecord, VectorIndexProvider};

/// Qdrant-backed vector index
pub struct QdrantIndex {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantIndex {
    pub fn new(config: &IndexConfig, vector_size: usize) -> Result<Self> {
        // A request timeout keeps a stuck backend from suspending callers
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::index(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.qdrant_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
            client,
            vector_size,
        })
    }

    /// Create the collection if it does not exist
    pub async fn ensure_collection(&self) -> Result<()> {
        let response = self
            .client
            .put(format!("{}/collections/{}", self.endpoint, self.collection))
            .json(&json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" },
            }))
            .send()
            .await?;

        // 409 means the collection already exists
        if !response.status().is_success() && response.status().as_u16() != 409 {
            return Err(Error::index(format!(
                "failed to create collection: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn check_status(response: &reqwest::Response, what: &str) -> Result<()> {
        if !response.status().is_success() {
            return Err(Error::index(format!(
                "{} failed: HTTP {}",
                what,
                response.status()
            )));
        }
        Ok(())
    }

    fn parse_hit(hit: &Value) -> Option<ScoredRecord> {
        let chunk_id = hit
            .pointer("/id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())?;
        let document_id = hit
            .pointer("/payload/document_id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())?;
        let chunk_index = hit.pointer("/payload/chunk_index").and_then(Value::as_u64)? as u32;
        let text = hit
            .pointer("/payload/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let similarity = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32;

        Some(ScoredRecord {
            record: VectorRecord {
                chunk_id,
                vector: Vec::new(),
                payload: RecordPayload {
                    document_id,
                    chunk_index,
                    text,
                },
            },
            similarity,
        })
    }
}

#[async_trait]
impl VectorIndexProvider for QdrantIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let points = records
            .iter()
            .map(|record| {
                if record.vector.len() != self.vector_size {
                    return Err(Error::index(format!(
                        "embedding dimension {} != {}",
                        record.vector.len(),
                        self.vector_size
                    )));
                }
                Ok(json!({
                    "id": record.chunk_id,
                    "vector": record.vector,
                    "payload": {
                        "document_id": record.payload.document_id,
                        "chunk_index": record.payload.chunk_index,
                        "text": record.payload.text,
                    },
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        Self::check_status(&response, "upsert")
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        document_filter: Option<&[Uuid]>,
    ) -> Result<Vec<ScoredRecord>> {
        if top_k == 0 || matches!(document_filter, Some([])) {
            return Ok(Vec::new());
        }
        if vector.len() != self.vector_size {
            return Err(Error::index(format!(
                "query vector dim {} is not {}",
                vector.len(),
                self.vector_size
            )));
        }

        let mut body = json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
        });
        if let Some(ids) = document_filter {
            body["filter"] = json!({
                "must": [{
                    "key": "document_id",
                    "match": { "any": ids },
                }],
            });
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.endpoint, self.collection
            ))
            .json(&body)
            .send()
            .await?;

        Self::check_status(&response, "search")?;

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(hits.iter().filter_map(Self::parse_hit).collect())
    }

    async fn delete_by_document(&self, document_id: Uuid) -> Result<usize> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/delete?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({
                "filter": {
                    "must": [{
                        "key": "document_id",
                        "match": { "value": document_id },
                    }],
                },
            }))
            .send()
            .await?;

        Self::check_status(&response, "delete by document")?;
        // Qdrant's filter delete does not report a count
        Ok(0)
    }

    async fn delete_chunks(&self, chunk_ids: &[Uuid]) -> Result<usize> {
        if chunk_ids.is_empty() {
            return Ok(0);
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/delete?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({ "points": chunk_ids }))
            .send()
            .await?;

        Self::check_status(&response, "delete chunks")?;
        Ok(chunk_ids.len())
    }

    async fn chunk_ids(&self) -> Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "limit": 1000,
                "with_payload": false,
                "with_vector": false,
            });
            if let Some(ref next) = offset {
                body["offset"] = next.clone();
            }

            let response = self
                .client
                .post(format!(
                    "{}/collections/{}/points/scroll",
                    self.endpoint, self.collection
                ))
                .json(&body)
                .send()
                .await?;

            Self::check_status(&response, "scroll")?;

            let parsed: Value = response.json().await?;
            let points = parsed
                .pointer("/result/points")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for point in &points {
                if let Some(id) = point
                    .pointer("/id")
                    .and_then(Value::as_str)
                    .and_then(|s| Uuid::parse_str(s).ok())
                {
                    ids.push(id);
                }
            }

            match parsed.pointer("/result/next_page_offset") {
                Some(next) if !next.is_null() => offset = Some(next.clone()),
                _ => break,
            }
        }

        Ok(ids)
    }

    async fn len(&self) -> Result<usize> {
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/count",
                self.endpoint, self.collection
            ))
            .json(&json!({ "exact": true }))
            .send()
            .await?;

        Self::check_status(&response, "count")?;

        let parsed: Value = response.json().await?;
        Ok(parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize)
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
