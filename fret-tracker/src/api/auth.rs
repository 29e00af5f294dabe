//! Reviewer gate for the review endpoints
//!
//! The chat adapter forwards the id of the user pressing a review button in
//! the `X-Reviewer-Id` header. A configured reviewer id of 0 turns the check
//! off.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::AppState;

pub const REVIEWER_HEADER: &str = "x-reviewer-id";

pub async fn reviewer_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if state.reviewer_id == 0 {
        return Ok(next.run(request).await);
    }

    let header = request
        .headers()
        .get(REVIEWER_HEADER)
        .ok_or(AuthError::MissingHeader)?;

    let caller: i64 = header
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .ok_or(AuthError::Malformed)?;

    if caller != state.reviewer_id {
        warn!("User {} attempted a review action", caller);
        return Err(AuthError::NotReviewer);
    }

    Ok(next.run(request).await)
}

#[derive(Debug)]
pub enum AuthError {
    MissingHeader,
    Malformed,
    NotReviewer,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingHeader => (StatusCode::UNAUTHORIZED, "Missing reviewer id"),
            AuthError::Malformed => (StatusCode::BAD_REQUEST, "Reviewer id must be an integer"),
            AuthError::NotReviewer => (StatusCode::FORBIDDEN, "Only the reviewer may do this"),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
