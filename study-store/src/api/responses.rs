//! Questionnaire responses

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use study_common::db::{self, QuestionnaireResponse};

use super::sessions::parse_participant;
use super::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

/// POST /api/responses
pub async fn create_response(
    State(state): State<AppState>,
    Json(response): Json<QuestionnaireResponse>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    validate(&response)?;

    let id = db::insert_response(&state.db, &response).await?;
    info!(
        participant_id = %response.participant_id,
        condition_id = %response.condition_id,
        response_id = %id,
        "Questionnaire response stored"
    );
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /api/responses/:participant_id
pub async fn list_responses(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> ApiResult<Json<Vec<QuestionnaireResponse>>> {
    let participant_id = parse_participant(participant_id)?;
    Ok(Json(db::list_responses(&state.db, &participant_id).await?))
}

fn validate(response: &QuestionnaireResponse) -> ApiResult<()> {
    if response.participant_id.as_str().trim().is_empty() {
        return Err(ApiError::BadRequest("participant_id is empty".to_string()));
    }
    if response.condition_id.trim().is_empty() {
        return Err(ApiError::BadRequest("video_id is empty".to_string()));
    }
    if response.watch_time_ms < 0 || response.return_count < 0 {
        return Err(ApiError::BadRequest(
            "watch_time_ms and return_count must not be negative".to_string(),
        ));
    }
    Ok(())
}
