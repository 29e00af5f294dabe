//! fret-tracker library - curriculum progress and review service
//!
//! Learners take lessons and song breakdowns one at a time, submit them
//! for review, and earn reputation and ranks when the reviewer approves.

use std::sync::Arc;

use axum::Router;
use fret_common::events::EventBus;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod locks;
pub mod model;
pub mod notify;
pub mod ranks;
pub mod store;
pub mod tracker;

pub use error::{Result, TrackerError};
pub use tracker::Tracker;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Tracker>,
    /// Bus the tracker's notifier publishes on; SSE clients subscribe here
    pub events: EventBus,
    /// Chat user id allowed to review (0 = anyone)
    pub reviewer_id: i64,
}

impl AppState {
    pub fn new(tracker: Arc<Tracker>, events: EventBus, reviewer_id: i64) -> Self {
        Self {
            tracker,
            events,
            reviewer_id,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use api::handlers;
    use axum::middleware;
    use axum::routing::{get, post};

    let review = Router::new()
        .route("/api/v1/review/pending", get(handlers::pending))
        .route("/api/v1/review/:id/approve", post(handlers::approve))
        .route("/api/v1/review/:id/reject", post(handlers::reject))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::reviewer_middleware,
        ));

    let public = Router::new()
        .route(
            "/api/v1/learners/:id",
            get(handlers::get_profile).post(handlers::register),
        )
        .route("/api/v1/learners/:id/lesson", post(handlers::assign_lesson))
        .route("/api/v1/learners/:id/song", post(handlers::assign_song))
        .route("/api/v1/learners/:id/submit", post(handlers::submit))
        .route("/api/v1/catalog/songs", get(handlers::list_songs))
        .route(
            "/api/v1/catalog/courses/:course/lessons",
            get(handlers::list_lessons),
        )
        .route("/api/v1/events", get(api::sse::event_stream))
        .merge(api::health_routes());

    Router::new()
        .merge(review)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
