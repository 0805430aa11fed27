//! API routes for the chat server

pub mod chat;
pub mod documents;
pub mod history;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Document management
        .route(
            "/upload",
            post(documents::upload).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/status", get(documents::status))
        .route("/documents", get(documents::list_documents))
        .route("/documents/:id", delete(documents::delete_document))
        .route("/merge", post(documents::merge))
        // Chat
        .route("/chat", post(chat::chat))
        .route("/translate", post(chat::translate))
        .route("/suggestions", get(chat::suggestions))
        // History
        .route("/history", get(history::list_sessions))
        .route("/history/session", post(history::save_session))
        .route("/history/session/:id", delete(history::delete_session))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "docchat",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Streaming RAG chat over uploaded documents",
        "endpoints": {
            "POST /api/upload": "Upload a document (multipart), ingestion runs async",
            "GET /api/status": "Poll ingestion status for a document",
            "GET /api/documents": "List all documents",
            "DELETE /api/documents/:id": "Delete a document and its vectors",
            "POST /api/merge": "Merge ready documents into a new one",
            "POST /api/chat": "Ask a question, answer streams as SSE",
            "POST /api/translate": "Translate a document, streamed as SSE",
            "GET /api/suggestions": "Follow-up question suggestions",
            "GET /api/history": "List chat sessions for a user",
            "POST /api/history/session": "Save or update a chat session",
            "DELETE /api/history/session/:id": "Delete a chat session"
        }
    }))
}
