//! Session upsert and lookup

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use study_common::db::{self, SessionRecord, SessionUpdate};
use study_common::ParticipantId;

use super::{ApiError, ApiResult};
use crate::AppState;

/// PUT /api/sessions/:participant_id
///
/// Insert-or-merge the participant's single session row.
pub async fn upsert_session(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
    Json(update): Json<SessionUpdate>,
) -> ApiResult<Json<SessionRecord>> {
    let participant_id = parse_participant(participant_id)?;
    if update.return_count.is_some_and(|n| n < 0) {
        return Err(ApiError::BadRequest(
            "return_count must not be negative".to_string(),
        ));
    }

    debug!(participant_id = %participant_id, run_id = %update.run_id, "Session upsert");
    let record = db::upsert_session(&state.db, &participant_id, &update).await?;
    Ok(Json(record))
}

/// GET /api/sessions/:participant_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
) -> ApiResult<Json<SessionRecord>> {
    let participant_id = parse_participant(participant_id)?;
    db::get_session(&state.db, &participant_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No session for participant {}", participant_id)))
}

pub(crate) fn parse_participant(raw: String) -> ApiResult<ParticipantId> {
    if raw.trim().is_empty() {
        return Err(ApiError::BadRequest("participant id is empty".to_string()));
    }
    Ok(ParticipantId::new(raw))
}
