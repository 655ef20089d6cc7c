//! Request-scoped context extracted from HTTP requests.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rsvp_id::RequestId;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Per-request context available to all handlers.
///
/// The request id is taken from the `X-Request-Id` header when the caller
/// provides one, otherwise generated fresh. It is echoed in every problem
/// response for correlation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| RequestId::new().to_string());

        Ok(Self { request_id })
    }
}
