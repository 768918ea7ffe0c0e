//! study-store library - session and response store service
//!
//! Serves the counts, session and response endpoints the participant client
//! talks to when it does not share the study database.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use study_common::config::CountBasis;

pub mod api;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Which sessions count toward a condition's tally
    pub count_basis: CountBasis,
}

impl AppState {
    pub fn new(db: SqlitePool, count_basis: CountBasis) -> Self {
        Self { db, count_basis }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route("/api/conditions/counts", get(api::condition_counts))
        .route(
            "/api/sessions/:participant_id",
            get(api::get_session).put(api::upsert_session),
        )
        .route("/api/responses", post(api::create_response))
        .route("/api/responses/:participant_id", get(api::list_responses));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        // Browser clients call from the media host's origin
        .layer(CorsLayer::permissive())
        .with_state(state)
}
