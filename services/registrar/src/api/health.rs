//! Health check endpoints.
//!
//! These endpoints are used by load balancers and orchestration systems
//! to determine if the service is healthy and ready to receive traffic.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status: "ok" or "degraded".
    pub status: String,

    /// Service name.
    pub service: String,

    /// Service version.
    pub version: String,

    /// Current timestamp (ISO 8601).
    pub timestamp: String,
}

fn health_response(status: &str) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        service: "rsvp-registrar".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    }
}

/// Create health check routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}

/// Liveness probe. Always succeeds while the process is running.
async fn healthz() -> impl IntoResponse {
    Json(health_response("ok"))
}

/// Readiness probe. Fails when the database is unreachable.
async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match state.db().health_check().await {
        Ok(()) => (StatusCode::OK, Json(health_response("ok"))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(health_response("degraded")),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, DbConfig};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn lazy_state() -> AppState {
        let db = Database::connect_lazy(&DbConfig::default()).expect("lazy pool");
        AppState::new(db)
    }

    #[tokio::test]
    async fn test_healthz_is_ok_without_database() {
        let app = crate::api::create_router(lazy_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = crate::api::create_router(lazy_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
