//! Database initialization tests against real files

use study_common::db::init::init_database;
use study_common::db::models::SessionUpdate;
use study_common::db::sessions::{get_session, upsert_session};
use study_common::{ParticipantId, Stage};
use uuid::Uuid;

#[tokio::test]
async fn test_database_created_with_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("study.db");

    let pool = init_database(&db_path).await;
    assert!(pool.is_ok(), "Database initialization failed: {:?}", pool.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_reopen_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("study.db");
    let pid = ParticipantId::new("p-1");

    {
        let pool = init_database(&db_path).await.unwrap();
        upsert_session(
            &pool,
            &pid,
            &SessionUpdate::new(Uuid::new_v4()).condition("A").stage(Stage::VideoComplete),
        )
        .await
        .unwrap();
        pool.close().await;
    }

    let pool = init_database(&db_path).await.unwrap();
    let stored = get_session(&pool, &pid).await.unwrap().unwrap();
    assert_eq!(stored.stage, Stage::VideoComplete);
    assert_eq!(stored.condition_id.as_deref(), Some("A"));
}
