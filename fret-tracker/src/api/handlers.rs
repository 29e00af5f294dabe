//! HTTP request handlers
//!
//! Thin wrappers over `Tracker` operations. Errors are mapped to status
//! codes by `ApiError`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, warn};

use crate::error::TrackerError;
use crate::model::{Assignment, AssignmentId, CourseId, Learner, LearnerId, LessonItem, SongId, SongItem};
use crate::tracker::{NextLesson, Profile, ReviewResult};
use crate::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SongRequest {
    pub song_id: i64,
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Tracker error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub TrackerError);

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        ApiError(err)
    }
}

impl From<fret_common::Error> for ApiError {
    fn from(err: fret_common::Error) -> Self {
        ApiError(TrackerError::Storage(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;

        if let TrackerError::AlreadyDecided {
            assignment_id,
            status,
        } = &err
        {
            debug!("{}", err);
            return Json(json!({
                "status": "already_decided",
                "assignment_id": assignment_id,
                "decision": status,
            }))
            .into_response();
        }

        let status = match &err {
            TrackerError::TaskConflict { .. }
            | TrackerError::NoActiveTask(_)
            | TrackerError::AlreadyCompleted(_) => StatusCode::CONFLICT,
            TrackerError::NotFound(_) | TrackerError::LearnerNotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TrackerError::AlreadyDecided { .. } => StatusCode::OK,
        };

        if matches!(err, TrackerError::Storage(_)) {
            error!("Request failed: {}", err);
        } else if err.is_integrity() {
            warn!("Request refused: {}", err);
        } else {
            debug!("Request refused: {}", err);
        }

        let body = Json(json!({
            "error": err.to_string(),
            "kind": err.kind(),
        }));

        (status, body).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// Learner Endpoints
// ============================================================================

/// POST /api/v1/learners/:id
pub async fn register(
    State(state): State<AppState>,
    Path(learner_id): Path<i64>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Learner> {
    let learner = state
        .tracker
        .register(LearnerId(learner_id), req.username, &req.display_name)
        .await?;
    Ok(Json(learner))
}

/// GET /api/v1/learners/:id
pub async fn get_profile(
    State(state): State<AppState>,
    Path(learner_id): Path<i64>,
) -> ApiResult<Profile> {
    Ok(Json(state.tracker.profile(LearnerId(learner_id)).await?))
}

/// POST /api/v1/learners/:id/lesson
pub async fn assign_lesson(
    State(state): State<AppState>,
    Path(learner_id): Path<i64>,
) -> ApiResult<NextLesson> {
    Ok(Json(
        state.tracker.assign_next_lesson(LearnerId(learner_id)).await?,
    ))
}

/// POST /api/v1/learners/:id/song
pub async fn assign_song(
    State(state): State<AppState>,
    Path(learner_id): Path<i64>,
    Json(req): Json<SongRequest>,
) -> ApiResult<SongItem> {
    let song = state
        .tracker
        .assign_song(LearnerId(learner_id), SongId(req.song_id))
        .await?;
    Ok(Json(song))
}

/// POST /api/v1/learners/:id/submit
pub async fn submit(
    State(state): State<AppState>,
    Path(learner_id): Path<i64>,
) -> ApiResult<Assignment> {
    Ok(Json(state.tracker.submit(LearnerId(learner_id)).await?))
}

// ============================================================================
// Catalog Endpoints
// ============================================================================

/// GET /api/v1/catalog/songs
pub async fn list_songs(State(state): State<AppState>) -> ApiResult<Vec<SongItem>> {
    Ok(Json(state.tracker.catalog().list_songs().await?))
}

/// GET /api/v1/catalog/courses/:course/lessons
pub async fn list_lessons(
    State(state): State<AppState>,
    Path(course): Path<i64>,
) -> ApiResult<Vec<LessonItem>> {
    Ok(Json(
        state.tracker.catalog().list_lessons(CourseId(course)).await?,
    ))
}

// ============================================================================
// Review Endpoints (reviewer only)
// ============================================================================

/// GET /api/v1/review/pending
pub async fn pending(State(state): State<AppState>) -> ApiResult<Vec<Assignment>> {
    Ok(Json(state.tracker.pending_assignments().await?))
}

/// POST /api/v1/review/:id/approve
pub async fn approve(
    State(state): State<AppState>,
    Path(assignment_id): Path<i64>,
) -> ApiResult<ReviewResult> {
    Ok(Json(
        state.tracker.approve(AssignmentId(assignment_id)).await?,
    ))
}

/// POST /api/v1/review/:id/reject
pub async fn reject(
    State(state): State<AppState>,
    Path(assignment_id): Path<i64>,
) -> ApiResult<Assignment> {
    Ok(Json(state.tracker.reject(AssignmentId(assignment_id)).await?))
}
