//! Chat, translation, and suggestion endpoints
//!
//! Streamed responses follow a fixed contract: one
//! `data: {"type":"token","data":...}` line per token, and a final
//! `data: [DONE]` line exactly once. An upstream failure surfaces as a
//! `{"type":"error",...}` event before the terminator, never as a
//! silently truncated answer.

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use uuid::Uuid;

use crate::error::Result;
use crate::generation::{PromptBuilder, StreamEvent, TokenStream};
use crate::server::state::AppState;
use crate::types::ChatMessage;

type SseEvent = std::result::Result<Event, Infallible>;

fn token_event(data: &str) -> SseEvent {
    Ok(Event::default().data(json!({"type": "token", "data": data}).to_string()))
}

fn error_event(message: &str) -> SseEvent {
    Ok(Event::default().data(json!({"type": "error", "data": message}).to_string()))
}

fn done_event() -> SseEvent {
    Ok(Event::default().data("[DONE]"))
}

/// Map a token stream onto the SSE wire contract. `trailer` is streamed
/// as a final token before `[DONE]` on successful completion.
fn sse_events(
    tokens: TokenStream,
    trailer: Option<String>,
) -> impl Stream<Item = SseEvent> + Send {
    tokens.into_stream().flat_map(move |event| {
        let out = match event {
            StreamEvent::Token(text) => vec![token_event(&text)],
            StreamEvent::Error(message) => vec![error_event(&message), done_event()],
            StreamEvent::Done => match &trailer {
                Some(text) => vec![token_event(text), done_event()],
                None => vec![done_event()],
            },
        };
        stream::iter(out)
    })
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub active_document_ids: Vec<Uuid>,
}

/// POST /api/chat - Answer a question over the active documents, streamed
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = SseEvent> + Send>> {
    let context = state
        .planner()
        .retrieve(&request.message, &request.active_document_ids)
        .await?;

    let prompt = PromptBuilder::chat_prompt(
        &request.message,
        &context.context_text(),
        &request.history,
        request.active_document_ids.len(),
        state.config().retrieval.history_messages,
    );

    tracing::info!(
        chunks = context.chunks.len(),
        active = request.active_document_ids.len(),
        "chat stream starting"
    );

    let tokens = state.streamer().generate(prompt);
    Ok(Sse::new(sse_events(tokens, None)).keep_alive(KeepAlive::default()))
}

#[derive(Deserialize)]
pub struct TranslateRequest {
    pub document_id: Uuid,
    pub target_language: String,
}

/// POST /api/translate - Translate a ready document, streamed.
///
/// The prompt is built from the full document text, not a retrieval
/// context; oversized documents are cut on a whitespace boundary and a
/// truncation notice is streamed after the translation.
pub async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> Result<Sse<impl Stream<Item = SseEvent> + Send>> {
    let document = state.manager().get(request.document_id)?;
    let text = state.manager().document_text(request.document_id)?;

    let (prompt, truncated) = PromptBuilder::translate_prompt(&text, &request.target_language);
    let header = PromptBuilder::translate_header(&document.display_name, &request.target_language);
    let trailer = truncated.then(PromptBuilder::truncation_notice);

    let tokens = state.streamer().generate(prompt);
    let events = stream::once(async move { token_event(&header) }).chain(sse_events(tokens, trailer));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

#[derive(Deserialize)]
pub struct SuggestionsQuery {
    pub message: String,
    pub answer: String,
}

#[derive(Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

/// GET /api/suggestions - Follow-up question suggestions for an exchange.
///
/// Best effort: an unreachable model or unparseable response yields an
/// empty list, not an error.
pub async fn suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionsQuery>,
) -> Json<SuggestionsResponse> {
    let prompt = PromptBuilder::suggestions_prompt(&query.message, &query.answer);

    let suggestions = match state.llm().complete(&prompt).await {
        Ok(response) => PromptBuilder::parse_suggestions(&response),
        Err(error) => {
            tracing::warn!("suggestions generation failed: {}", error);
            Vec::new()
        }
    };

    Json(SuggestionsResponse { suggestions })
}
