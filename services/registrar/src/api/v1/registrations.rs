//! Registration API endpoints: join and leave.
//!
//! These are thin adapters over the registration engine; every success/failure
//! decision happens in the store's atomic conditional update, and each engine
//! outcome maps to a stable problem code here.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use rsvp_registry::{Registration, RegistrationError};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::RequestContext;
use crate::state::AppState;

use super::events::{parse_event_id, parse_user_id, EventResponse};

/// Registration routes, mounted alongside the event routes.
///
/// /v1/events/{event_id}/join, /v1/events/{event_id}/leave
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/{event_id}/join", post(join_event))
        .route("/{event_id}/leave", post(leave_event))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct RegistrationRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub attendee_count: usize,
    pub event: EventResponse,
}

impl From<Registration> for RegistrationResponse {
    fn from(reg: Registration) -> Self {
        Self {
            attendee_count: reg.attendee_count,
            event: EventResponse::from(reg.event),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn registration_error(err: RegistrationError, request_id: &str) -> ApiError {
    let api_error = match err {
        RegistrationError::NotFound => ApiError::not_found("event_not_found", "Event not found"),
        RegistrationError::AlreadyJoined => ApiError::conflict(
            "already_joined",
            "Participant is already registered for this event",
        ),
        RegistrationError::Full => ApiError::conflict("event_full", "Event is at capacity"),
        RegistrationError::Conflict => ApiError::conflict(
            "conflict",
            "Registration conflicted with a concurrent update, please retry",
        )
        .with_retryable(true),
        RegistrationError::Store(e) => {
            tracing::error!(error = %e, request_id = %request_id, "Registration store failure");
            ApiError::internal("internal_error", "Registration is temporarily unavailable")
        }
    };
    api_error.with_request_id(request_id.to_string())
}

/// Join event.
///
/// POST /v1/events/{event_id}/join
async fn join_event(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(event_id): Path<String>,
    Json(req): Json<RegistrationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = ctx.request_id.clone();
    let event_id = parse_event_id(&event_id, &request_id)?;
    let user_id = parse_user_id(&req.user_id, "invalid_user_id", &request_id)?;

    let registration = state
        .registry()
        .join(event_id, user_id)
        .await
        .map_err(|e| registration_error(e, &request_id))?;

    Ok(Json(RegistrationResponse::from(registration)))
}

/// Leave event.
///
/// POST /v1/events/{event_id}/leave
async fn leave_event(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(event_id): Path<String>,
    Json(req): Json<RegistrationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = ctx.request_id.clone();
    let event_id = parse_event_id(&event_id, &request_id)?;
    let user_id = parse_user_id(&req.user_id, "invalid_user_id", &request_id)?;

    let registration = state
        .registry()
        .leave(event_id, user_id)
        .await
        .map_err(|e| registration_error(e, &request_id))?;

    Ok(Json(RegistrationResponse::from(registration)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use rsvp_registry::StoreError;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = registration_error(RegistrationError::NotFound, "req_1");
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.problem.code, "event_not_found");
    }

    #[test]
    fn test_full_and_already_joined_map_to_409_terminal() {
        for (err, code) in [
            (RegistrationError::Full, "event_full"),
            (RegistrationError::AlreadyJoined, "already_joined"),
        ] {
            let api = registration_error(err, "req_1");
            assert_eq!(api.status, StatusCode::CONFLICT);
            assert_eq!(api.problem.code, code);
            assert!(!api.problem.retryable);
        }
    }

    #[test]
    fn test_conflict_maps_to_retryable_409() {
        let err = registration_error(RegistrationError::Conflict, "req_1");
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert!(err.problem.retryable);
    }

    #[test]
    fn test_store_fault_maps_to_500() {
        let err = registration_error(
            RegistrationError::Store(StoreError::Unavailable("down".to_string())),
            "req_1",
        );
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.problem.code, "internal_error");
    }
}
