//! Condition counts

use axum::{extract::State, Json};

use study_common::{db, ConditionCount};

use super::ApiResult;
use crate::AppState;

/// GET /api/conditions/counts
///
/// Per-condition session tallies under the configured count basis.
/// Conditions with no counted sessions are omitted.
pub async fn condition_counts(State(state): State<AppState>) -> ApiResult<Json<Vec<ConditionCount>>> {
    let counts = db::condition_counts(&state.db, state.count_basis).await?;
    Ok(Json(counts))
}
