//! Database initialization
//!
//! Creates the database file and schema on first run; safe to call on every
//! startup since every statement is idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database at `db_path` and ensure the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the store serve counts queries while an upsert is writing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Each SQLite `:memory:` connection is its own database, so the pool is
/// capped at one connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_tables(&pool).await?;
    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_sessions_table(pool).await?;
    create_responses_table(pool).await?;
    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    // stage: 0 = assigned, 1 = video-complete, 2 = questionnaire-complete
    // created_at/updated_at: Unix milliseconds
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS study_sessions (
            participant_id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL,
            condition_id TEXT,
            stage INTEGER NOT NULL DEFAULT 0 CHECK (stage BETWEEN 0 AND 2),
            return_count INTEGER NOT NULL DEFAULT 0 CHECK (return_count >= 0),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_study_sessions_condition ON study_sessions(condition_id, stage)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_responses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS study_responses (
            id TEXT PRIMARY KEY,
            participant_id TEXT NOT NULL,
            condition_id TEXT NOT NULL,
            liked INTEGER NOT NULL,
            cart INTEGER NOT NULL,
            watch_time_ms INTEGER NOT NULL,
            completed INTEGER NOT NULL,
            return_count INTEGER NOT NULL DEFAULT 0,
            answers TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_study_responses_participant ON study_responses(participant_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
