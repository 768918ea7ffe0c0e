//! Per-condition tallies for load-balanced assignment

use sqlx::{Pool, Row, Sqlite};

use crate::config::CountBasis;
use crate::model::{ConditionCount, Stage};
use crate::Result;

/// Count sessions per assigned condition
///
/// `CountBasis::Completed` counts only sessions at questionnaire-complete;
/// `CountBasis::Exposed` counts every session that has a condition. Conditions
/// with no qualifying session are absent from the result.
pub async fn condition_counts(db: &Pool<Sqlite>, basis: CountBasis) -> Result<Vec<ConditionCount>> {
    let min_stage = match basis {
        CountBasis::Completed => Stage::QuestionnaireComplete,
        CountBasis::Exposed => Stage::Assigned,
    };

    let rows = sqlx::query(
        r#"
        SELECT condition_id, COUNT(*) AS count
        FROM study_sessions
        WHERE condition_id IS NOT NULL AND stage >= ?
        GROUP BY condition_id
        ORDER BY condition_id
        "#,
    )
    .bind(min_stage.ordinal())
    .fetch_all(db)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ConditionCount {
            condition_id: row.get("condition_id"),
            count: row.get("count"),
        })
        .collect())
}
