//! Chat history endpoints, backed by the session store

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::server::state::AppState;
use crate::storage::ChatSession;

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<ChatSession>,
}

/// GET /api/history?user_id= - All sessions for a user, newest first
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<SessionListResponse>> {
    let sessions = state.sessions().sessions_for_user(&query.user_id)?;
    Ok(Json(SessionListResponse { sessions }))
}

#[derive(Serialize)]
pub struct SavedResponse {
    pub saved: bool,
}

/// POST /api/history/session - Save or update a session
pub async fn save_session(
    State(state): State<AppState>,
    Json(session): Json<ChatSession>,
) -> Result<Json<SavedResponse>> {
    state.sessions().upsert_session(&session)?;
    Ok(Json(SavedResponse { saved: true }))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

/// DELETE /api/history/session/:id?user_id= - Delete a session; idempotent
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<DeletedResponse>> {
    state.sessions().delete_session(&query.user_id, &id)?;
    Ok(Json(DeletedResponse { deleted: true }))
}
