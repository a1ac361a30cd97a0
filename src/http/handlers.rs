use super::state::AppState;
use crate::error::{AppError, AppResult};
use crate::gemini::{ChatRole, ChatTurn};
use crate::live::{LiveStatus, TranscriptTurn};
use crate::tariff::{self, filter, queries, Filters, Suggestion, TariffItem};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::sse::{Event, Sse},
    response::IntoResponse,
    Json,
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Optional numeric-rate narrowing applied after retrieval
    #[serde(default)]
    pub filters: Filters,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub items: Vec<TariffItem>,
    /// Matches before filtering
    pub total: usize,
    /// Matches surviving the filters
    pub filtered: usize,
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Omitted on the first message; returned to the client for follow-ups
    pub chat_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LiveStatusResponse {
    pub session_id: String,
    pub status: LiveStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct LiveTranscriptResponse {
    pub session_id: String,
    pub turns: Vec<TranscriptTurn>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service.name,
    }))
}

/// POST /tariffs/search
/// Query the tariff schedule, then narrow by any given rate conditions.
pub async fn search_tariffs(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> AppResult<Json<SearchResponse>> {
    if req.query.trim().is_empty() {
        return Err(AppError::InvalidRequest("query must not be empty".to_string()));
    }

    let items = queries::search_tariffs(&state.gemini, &req.query).await?;
    let total = items.len();
    let filtered_items = filter::apply(&items, &req.filters);

    info!(
        "tariff search '{}': {} matches, {} after filters",
        req.query,
        total,
        filtered_items.len()
    );

    Ok(Json(SearchResponse {
        filtered: filtered_items.len(),
        total,
        items: filtered_items,
    }))
}

/// GET /tariffs/suggest?q=...
pub async fn suggest_tariffs(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Json<Vec<Suggestion>> {
    Json(queries::tariff_suggestions(&state.gemini, &params.q).await)
}

/// GET /tariffs/export?query=...
/// Run a fresh search and render it as CSV.
pub async fn export_tariffs(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> AppResult<impl IntoResponse> {
    let items = queries::search_tariffs(&state.gemini, &params.query).await?;
    let csv = tariff::export::render_csv(&items);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"drc_tariff_export.csv\"",
            ),
        ],
        csv,
    ))
}

/// GET /bivac/:report_id
pub async fn check_bivac(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> AppResult<Json<tariff::BivacReport>> {
    let report = queries::check_bivac_status(&state.gemini, &report_id).await?;
    Ok(Json(report))
}

/// GET /vehicles/:chassis_number
pub async fn vehicle_report(
    State(state): State<AppState>,
    Path(chassis_number): Path<String>,
) -> AppResult<Json<tariff::VehicleReport>> {
    let report = queries::vehicle_report(&state.gemini, &chassis_number).await?;
    Ok(Json(report))
}

/// POST /chat
/// Stream the assistant's reply as server-sent events. The first event
/// carries the chat id; the finished reply is appended to the history.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if req.message.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "message must not be empty".to_string(),
        ));
    }

    let chat_id = req
        .chat_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let history = {
        let mut chats = state.chats.write().await;
        let history = chats.entry(chat_id.clone()).or_default();
        history.push(ChatTurn {
            role: ChatRole::User,
            content: req.message.clone(),
        });
        history.clone()
    };

    let mut chunks = state
        .gemini
        .stream_chat(&history, queries::CHAT_SYSTEM_INSTRUCTION)
        .await?;

    let (tx, rx) = tokio::sync::mpsc::channel::<Event>(32);
    let chats = state.chats.clone();
    tokio::spawn(async move {
        let _ = tx.send(Event::default().event("chat").data(&chat_id)).await;

        let mut reply = String::new();
        while let Some(item) = chunks.recv().await {
            match item {
                Ok(text) => {
                    reply.push_str(&text);
                    if tx
                        .send(Event::default().event("chunk").data(text))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    warn!("chat stream for {chat_id} aborted: {e}");
                    let _ = tx
                        .send(Event::default().event("error").data(e.to_string()))
                        .await;
                    break;
                }
            }
        }

        if !reply.is_empty() {
            chats
                .write()
                .await
                .entry(chat_id)
                .or_default()
                .push(ChatTurn {
                    role: ChatRole::Model,
                    content: reply,
                });
        }
        let _ = tx.send(Event::default().event("done")).await;
    });

    Ok(Sse::new(ReceiverStream::new(rx).map(Ok)))
}

/// GET /live/:session_id/status
pub async fn live_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<LiveStatusResponse>> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&session_id)
        .ok_or_else(|| AppError::NotFound(format!("no live session '{session_id}'")))?;

    Ok(Json(LiveStatusResponse {
        status: session.status().await,
        created_at: session.created_at(),
        session_id,
    }))
}

/// GET /live/:session_id/transcript
pub async fn live_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<LiveTranscriptResponse>> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&session_id)
        .ok_or_else(|| AppError::NotFound(format!("no live session '{session_id}'")))?;

    Ok(Json(LiveTranscriptResponse {
        turns: session.transcript().await,
        session_id,
    }))
}
