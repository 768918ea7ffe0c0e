//! Questionnaire response persistence
//!
//! Append-only: every successful submission is one row.

use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use crate::db::models::QuestionnaireResponse;
use crate::model::ParticipantId;
use crate::time;
use crate::{Error, Result};

/// Store one response and return its generated id
pub async fn insert_response(db: &Pool<Sqlite>, response: &QuestionnaireResponse) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let answers = serde_json::to_string(&response.answers)?;

    sqlx::query(
        r#"
        INSERT INTO study_responses
            (id, participant_id, condition_id, liked, cart, watch_time_ms, completed,
             return_count, answers, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(response.participant_id.as_str())
    .bind(&response.condition_id)
    .bind(response.liked)
    .bind(response.cart)
    .bind(response.watch_time_ms)
    .bind(response.completed)
    .bind(response.return_count)
    .bind(answers)
    .bind(response.created_at.timestamp_millis())
    .execute(db)
    .await?;

    Ok(id)
}

/// All responses of one participant, oldest first
pub async fn list_responses(
    db: &Pool<Sqlite>,
    participant_id: &ParticipantId,
) -> Result<Vec<QuestionnaireResponse>> {
    let rows = sqlx::query(
        r#"
        SELECT participant_id, condition_id, liked, cart, watch_time_ms, completed,
               return_count, answers, created_at
        FROM study_responses
        WHERE participant_id = ?
        ORDER BY created_at, rowid
        "#,
    )
    .bind(participant_id.as_str())
    .fetch_all(db)
    .await?;

    rows.iter()
        .map(|row| -> Result<QuestionnaireResponse> {
            let answers: String = row.get("answers");
            let answers = serde_json::from_str::<serde_json::Value>(&answers)?;
            let answers = match answers {
                serde_json::Value::Object(map) => map,
                other => {
                    return Err(Error::Internal(format!(
                        "study_responses.answers is not an object: {}",
                        other
                    )))
                }
            };

            Ok(QuestionnaireResponse {
                participant_id: ParticipantId::new(row.get::<String, _>("participant_id")),
                condition_id: row.get("condition_id"),
                liked: row.get("liked"),
                cart: row.get("cart"),
                watch_time_ms: row.get("watch_time_ms"),
                completed: row.get("completed"),
                return_count: row.get("return_count"),
                answers,
                created_at: time::from_millis(row.get("created_at")),
            })
        })
        .collect()
}
