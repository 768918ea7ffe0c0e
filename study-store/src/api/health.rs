//! Health check endpoint
//!
//! Reports whether the study database answers and how balancing counts are
//! computed, so an operator can confirm a deployment before enrolling.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use study_common::config::CountBasis;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database does not answer
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub build: &'static str,
    pub count_basis: CountBasis,
    /// Session rows stored so far; absent when the database is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<i64>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let sessions = match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM study_sessions")
        .fetch_one(&state.db)
        .await
    {
        Ok(count) => Some(count),
        Err(e) => {
            warn!("Health check could not reach database: {}", e);
            None
        }
    };

    let (code, status) = match sessions {
        Some(_) => (StatusCode::OK, "ok"),
        None => (StatusCode::SERVICE_UNAVAILABLE, "degraded"),
    };

    (
        code,
        Json(HealthResponse {
            status,
            module: "study-store",
            version: env!("CARGO_PKG_VERSION"),
            build: env!("GIT_HASH"),
            count_basis: state.count_basis,
            sessions,
        }),
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
