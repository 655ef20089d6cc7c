//! Event API endpoints.
//!
//! Events are creator-owned resources. Creator-only rules (capacity changes,
//! deletion) are enforced in the store predicate, not by reading first:
//! a conditional update either applies or is classified after the fact.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rsvp_id::{EventId, UserId};
use rsvp_registry::EventRecord;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::RequestContext;
use crate::db::NewEvent;
use crate::state::AppState;

/// Event routes.
///
/// /v1/events
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_event))
        .route("/{event_id}", get(get_event).delete(delete_event))
        .route("/{event_id}/capacity", patch(set_capacity))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub capacity: i32,
    pub creator_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetCapacityRequest {
    pub capacity: i32,
    pub actor_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteEventQuery {
    pub actor_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: String,
    pub title: String,
    pub capacity: i32,
    pub attendee_count: usize,
    pub attendees: Vec<String>,
    pub creator_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventRecord> for EventResponse {
    fn from(record: EventRecord) -> Self {
        Self {
            id: record.id.to_string(),
            title: record.title.clone(),
            capacity: record.capacity,
            attendee_count: record.attendee_count(),
            attendees: record.attendees.iter().map(|a| a.to_string()).collect(),
            creator_id: record.creator.to_string(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub(super) fn parse_event_id(raw: &str, request_id: &str) -> Result<EventId, ApiError> {
    raw.parse().map_err(|_| {
        ApiError::bad_request("invalid_event_id", "Invalid event ID format")
            .with_request_id(request_id.to_string())
    })
}

pub(super) fn parse_user_id(
    raw: &str,
    code: &'static str,
    request_id: &str,
) -> Result<UserId, ApiError> {
    raw.parse().map_err(|_| {
        ApiError::bad_request(code, "Invalid user ID format")
            .with_request_id(request_id.to_string())
    })
}

fn validate_capacity(capacity: i32, request_id: &str) -> Result<(), ApiError> {
    if capacity < 1 {
        return Err(
            ApiError::bad_request("invalid_capacity", "capacity must be >= 1")
                .with_request_id(request_id.to_string()),
        );
    }
    Ok(())
}

/// Classify a rejected conditional delete from a diagnostic read.
///
/// The read happens after the rejection, so the surviving record may have
/// moved; a row whose creator matches the actor means the rejection raced a
/// concurrent change, not an authorization failure.
fn delete_rejection(diagnostic: Option<EventRecord>, actor: UserId, request_id: &str) -> ApiError {
    match diagnostic {
        None => ApiError::not_found("event_not_found", "Event not found"),
        Some(record) if record.creator != actor => {
            ApiError::forbidden("not_event_creator", "Only the event creator may delete it")
        }
        Some(_) => ApiError::conflict(
            "conflict",
            "The delete conflicted with a concurrent change, please retry",
        )
        .with_retryable(true),
    }
    .with_request_id(request_id.to_string())
}

// =============================================================================
// Handlers
// =============================================================================

/// Create event.
///
/// POST /v1/events
async fn create_event(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(mut req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = ctx.request_id.clone();

    req.title = req.title.trim().to_string();
    if req.title.is_empty() {
        return Err(
            ApiError::bad_request("invalid_title", "title cannot be empty")
                .with_request_id(request_id),
        );
    }
    validate_capacity(req.capacity, &request_id)?;
    let creator = parse_user_id(&req.creator_id, "invalid_creator_id", &request_id)?;

    let record = state
        .db()
        .event_store()
        .create_event(NewEvent {
            title: req.title,
            capacity: req.capacity,
            creator,
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, request_id = %request_id, "Failed to create event");
            ApiError::internal("internal_error", "Failed to create event")
                .with_request_id(request_id.clone())
        })?;

    Ok((StatusCode::CREATED, Json(EventResponse::from(record))))
}

/// Get event.
///
/// GET /v1/events/{event_id}
async fn get_event(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = ctx.request_id.clone();
    let event_id = parse_event_id(&event_id, &request_id)?;

    let record = state
        .db()
        .event_store()
        .fetch(event_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, request_id = %request_id, event_id = %event_id, "Failed to fetch event");
            ApiError::internal("internal_error", "Failed to fetch event")
                .with_request_id(request_id.clone())
        })?
        .ok_or_else(|| {
            ApiError::not_found("event_not_found", "Event not found")
                .with_request_id(request_id.clone())
        })?;

    Ok(Json(EventResponse::from(record)))
}

/// Change event capacity.
///
/// PATCH /v1/events/{event_id}/capacity
async fn set_capacity(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(event_id): Path<String>,
    Json(req): Json<SetCapacityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = ctx.request_id.clone();
    let event_id = parse_event_id(&event_id, &request_id)?;
    validate_capacity(req.capacity, &request_id)?;
    let actor = parse_user_id(&req.actor_id, "invalid_actor_id", &request_id)?;

    let store = state.db().event_store();
    let updated = store
        .set_capacity(event_id, actor, req.capacity)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, request_id = %request_id, event_id = %event_id, "Failed to set capacity");
            ApiError::internal("internal_error", "Failed to set capacity")
                .with_request_id(request_id.clone())
        })?;

    if let Some(record) = updated {
        return Ok(Json(EventResponse::from(record)));
    }

    // The conditional update did not apply. Classify with a read; state may
    // have moved since the rejection, so the answer is best-effort.
    let diagnostic = store.fetch(event_id).await.map_err(|e| {
        tracing::error!(error = %e, request_id = %request_id, event_id = %event_id, "Failed to classify capacity rejection");
        ApiError::internal("internal_error", "Failed to set capacity")
            .with_request_id(request_id.clone())
    })?;

    Err(match diagnostic {
        None => ApiError::not_found("event_not_found", "Event not found"),
        Some(record) if record.creator != actor => ApiError::forbidden(
            "not_event_creator",
            "Only the event creator may change capacity",
        ),
        Some(record) if record.attendee_count() > req.capacity as usize => ApiError::conflict(
            "capacity_below_attendance",
            "capacity cannot be lowered below the current attendee count",
        ),
        Some(_) => ApiError::conflict(
            "conflict",
            "The update conflicted with a concurrent change, please retry",
        )
        .with_retryable(true),
    }
    .with_request_id(request_id))
}

/// Delete event.
///
/// DELETE /v1/events/{event_id}?actor_id={user_id}
async fn delete_event(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(event_id): Path<String>,
    Query(query): Query<DeleteEventQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let request_id = ctx.request_id.clone();
    let event_id = parse_event_id(&event_id, &request_id)?;
    let actor = parse_user_id(&query.actor_id, "invalid_actor_id", &request_id)?;

    let store = state.db().event_store();
    let deleted = store.delete_event(event_id, actor).await.map_err(|e| {
        tracing::error!(error = %e, request_id = %request_id, event_id = %event_id, "Failed to delete event");
        ApiError::internal("internal_error", "Failed to delete event")
            .with_request_id(request_id.clone())
    })?;

    if deleted {
        return Ok(Json(DeleteResponse { ok: true }));
    }

    let diagnostic = store.fetch(event_id).await.map_err(|e| {
        tracing::error!(error = %e, request_id = %request_id, event_id = %event_id, "Failed to classify delete rejection");
        ApiError::internal("internal_error", "Failed to delete event")
            .with_request_id(request_id.clone())
    })?;

    Err(delete_rejection(diagnostic, actor, &request_id))
}
