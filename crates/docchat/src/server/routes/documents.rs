//! Document management endpoints: upload, status, list, delete, merge

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::Document;

#[derive(Serialize)]
pub struct UploadResponse {
    pub document_id: Uuid,
    pub status: String,
}

/// POST /api/upload - Accept a document and start async ingestion
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|s| s.to_string()) else {
            continue;
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::validation(format!("Failed to read upload: {}", e)))?;

        let document = state.manager().add(filename, data.to_vec()).await?;
        return Ok(Json(UploadResponse {
            document_id: document.id,
            status: document.status.as_str().to_string(),
        }));
    }

    Err(Error::validation("no file field in upload"))
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub document_id: Uuid,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub document_id: Uuid,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /api/status?document_id= - Poll ingestion status
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>> {
    let document = state.manager().get(query.document_id)?;
    Ok(Json(StatusResponse {
        document_id: document.id,
        status: document.status.as_str().to_string(),
        error: document.error,
    }))
}

#[derive(Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<Document>,
}

/// GET /api/documents - List all documents
pub async fn list_documents(State(state): State<AppState>) -> Json<DocumentListResponse> {
    Json(DocumentListResponse {
        documents: state.manager().documents(),
    })
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// DELETE /api/documents/:id - Remove a document and its vectors; idempotent
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteResponse>> {
    state.manager().delete(id).await?;
    Ok(Json(DeleteResponse { deleted: true }))
}

#[derive(Deserialize)]
pub struct MergeRequest {
    pub document_ids: Vec<Uuid>,
    pub output_name: String,
}

/// POST /api/merge - Merge ready documents into a new one
pub async fn merge(
    State(state): State<AppState>,
    Json(request): Json<MergeRequest>,
) -> Result<Json<UploadResponse>> {
    if request.output_name.trim().is_empty() {
        return Err(Error::validation("output_name must not be empty"));
    }

    let document = state
        .manager()
        .merge(&request.document_ids, request.output_name)
        .await?;

    Ok(Json(UploadResponse {
        document_id: document.id,
        status: document.status.as_str().to_string(),
    }))
}
