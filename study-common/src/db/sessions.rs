//! Session row upserts
//!
//! One row per participant, written only through [`upsert_session`]:
//! - a different `run_id` re-initialises the row (explicit restart)
//! - within a run, provided fields overwrite and absent fields persist
//! - within a run, `stage` and `return_count` never decrease and
//!   `updated_at` keeps the latest write time
//! - a provided `condition_id` only replaces a stored one when the write is
//!   not older than the stored row
//! - a write for another run that is older than the stored row is dropped
//!
//! All of this happens in one `INSERT ... ON CONFLICT DO UPDATE` statement, so
//! concurrent writers for the same participant are serialized by SQLite and
//! converge to the same final row regardless of arrival order.

use sqlx::{sqlite::SqliteRow, Pool, Row, Sqlite};
use tracing::debug;
use uuid::Uuid;

use crate::db::models::{SessionRecord, SessionUpdate};
use crate::model::{ParticipantId, Stage};
use crate::time;
use crate::{Error, Result};

/// Insert or update the participant's session row and return the stored row
pub async fn upsert_session(
    db: &Pool<Sqlite>,
    participant_id: &ParticipantId,
    update: &SessionUpdate,
) -> Result<SessionRecord> {
    let written_at = update.updated_at.timestamp_millis();
    let stage = update.stage.map(Stage::ordinal);

    let result = sqlx::query(
        r#"
        INSERT INTO study_sessions
            (participant_id, run_id, condition_id, stage, return_count, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(participant_id) DO UPDATE SET
            condition_id = CASE
                WHEN study_sessions.run_id <> excluded.run_id THEN excluded.condition_id
                WHEN excluded.updated_at >= study_sessions.updated_at
                    THEN COALESCE(?, study_sessions.condition_id)
                ELSE COALESCE(study_sessions.condition_id, ?) END,
            stage = CASE WHEN study_sessions.run_id = excluded.run_id
                THEN MAX(study_sessions.stage, COALESCE(?, study_sessions.stage))
                ELSE excluded.stage END,
            return_count = CASE WHEN study_sessions.run_id = excluded.run_id
                THEN MAX(study_sessions.return_count, COALESCE(?, study_sessions.return_count))
                ELSE excluded.return_count END,
            created_at = CASE WHEN study_sessions.run_id = excluded.run_id
                THEN MIN(study_sessions.created_at, excluded.created_at)
                ELSE excluded.created_at END,
            run_id = excluded.run_id,
            updated_at = MAX(study_sessions.updated_at, excluded.updated_at)
        WHERE study_sessions.run_id = excluded.run_id
           OR excluded.updated_at >= study_sessions.updated_at
        "#,
    )
    .bind(participant_id.as_str())
    .bind(update.run_id.to_string())
    .bind(update.condition_id.as_deref())
    .bind(stage.unwrap_or(Stage::Assigned.ordinal()))
    .bind(update.return_count.unwrap_or(0))
    .bind(written_at)
    .bind(written_at)
    .bind(update.condition_id.as_deref())
    .bind(update.condition_id.as_deref())
    .bind(stage)
    .bind(update.return_count)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        debug!(
            participant_id = %participant_id,
            "Session write for a previous run arrived late, keeping stored state"
        );
    }

    get_session(db, participant_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Session row missing after upsert: {}", participant_id)))
}

/// Read the participant's session row
pub async fn get_session(
    db: &Pool<Sqlite>,
    participant_id: &ParticipantId,
) -> Result<Option<SessionRecord>> {
    let row = sqlx::query(
        r#"
        SELECT participant_id, run_id, condition_id, stage, return_count, created_at, updated_at
        FROM study_sessions
        WHERE participant_id = ?
        "#,
    )
    .bind(participant_id.as_str())
    .fetch_optional(db)
    .await?;

    row.map(|r| session_from_row(&r)).transpose()
}

fn session_from_row(row: &SqliteRow) -> Result<SessionRecord> {
    let run_id: String = row.get("run_id");
    let run_id = Uuid::parse_str(&run_id)
        .map_err(|e| Error::Internal(format!("Invalid run_id in study_sessions: {}", e)))?;

    let stage: i64 = row.get("stage");
    let stage = Stage::from_ordinal(stage)
        .ok_or_else(|| Error::Internal(format!("Invalid stage ordinal in study_sessions: {}", stage)))?;

    Ok(SessionRecord {
        participant_id: ParticipantId::new(row.get::<String, _>("participant_id")),
        run_id,
        condition_id: row.get("condition_id"),
        stage,
        return_count: row.get("return_count"),
        created_at: time::from_millis(row.get("created_at")),
        updated_at: time::from_millis(row.get("updated_at")),
    })
}
