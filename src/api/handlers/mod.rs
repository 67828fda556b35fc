use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
    Extension, Json,
};
use futures::Stream;
use serde::Deserialize;
use tokio_stream::{wrappers::BroadcastStream, StreamExt as _};

use crate::models::*;
use crate::remote::{NoteFilter, SortOrder};
use crate::service::{NoteService, ServiceError};
use crate::summarize::SummarizeError;

// ============================================================
// Error Handling
// ============================================================

/// Map a service error to a response. Internal failures are logged in full
/// and reported to the client generically.
fn service_error(e: ServiceError) -> (StatusCode, String) {
    match e {
        ServiceError::NotFound => (StatusCode::NOT_FOUND, "Note not found".to_string()),
        ServiceError::Validation(msg) => {
            tracing::warn!("Validation error: {}", msg);
            (StatusCode::BAD_REQUEST, msg)
        }
        ServiceError::Summarize(SummarizeError::EmptyInput) => (
            StatusCode::BAD_REQUEST,
            "Text to summarize must not be empty".to_string(),
        ),
        ServiceError::Summarize(e) => {
            tracing::error!("Summarizer error: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                "Summary provider failed".to_string(),
            )
        }
        ServiceError::Internal(e) => {
            tracing::error!("Internal error: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Identity
// ============================================================

pub async fn current_user(Extension(user): Extension<CurrentUser>) -> Json<CurrentUser> {
    Json(user)
}

// ============================================================
// Notes
// ============================================================

#[derive(Debug, Deserialize)]
pub struct ListNotesQuery {
    pub order: Option<String>,
}

pub async fn list_notes(
    State(service): State<NoteService>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListNotesQuery>,
) -> Result<Json<Vec<RemoteNoteRecord>>, (StatusCode, String)> {
    let order = match query.order.as_deref() {
        None => SortOrder::default(),
        Some(s) => s.parse().map_err(|e| (StatusCode::BAD_REQUEST, e))?,
    };
    let filter = NoteFilter {
        user_id: user.id.clone(),
        order,
    };
    service
        .list(&user, &filter)
        .map(Json)
        .map_err(service_error)
}

pub async fn get_note(
    State(service): State<NoteService>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<RemoteNoteRecord>, (StatusCode, String)> {
    service.get(&user, &id).map(Json).map_err(service_error)
}

pub async fn create_note(
    State(service): State<NoteService>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<RemoteNoteInsert>,
) -> Result<(StatusCode, Json<RemoteNoteRecord>), (StatusCode, String)> {
    service
        .create(&user, input)
        .map(|n| (StatusCode::CREATED, Json(n)))
        .map_err(service_error)
}

pub async fn update_note(
    State(service): State<NoteService>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(patch): Json<RemoteNotePatch>,
) -> Result<StatusCode, (StatusCode, String)> {
    service
        .update(&user, &id, patch)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(service_error)
}

pub async fn delete_note(
    State(service): State<NoteService>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    service
        .delete(&user, &id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(service_error)
}

/// Server-Sent Events stream of the caller's note changes.
pub async fn note_events(
    State(service): State<NoteService>,
    Extension(user): Extension<CurrentUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = service.bus().subscribe();
    tracing::info!(user = %user.id, "Note event stream opened");

    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(owned) if owned.user_id == user.id => {
            let kind = owned.change.kind().as_str();
            match serde_json::to_string(&owned.change) {
                Ok(json) => Some(Ok(Event::default().event(kind).data(json))),
                Err(e) => {
                    tracing::error!("Failed to encode note change: {}", e);
                    None
                }
            }
        }
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("Note event stream lagged: {}", e);
            None
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}

// ============================================================
// Summaries
// ============================================================

pub async fn summarize(
    State(service): State<NoteService>,
    Json(input): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, (StatusCode, String)> {
    service
        .summarize(&input.text)
        .await
        .map(|summary| Json(SummarizeResponse { summary }))
        .map_err(service_error)
}
