//! Session recorder
//!
//! Keeps exactly one session row per participant, updated in place as the
//! flow advances. Writes are best-effort bookkeeping: a failed write is
//! logged and reported on the event bus, and the caller decides whether to
//! care. The flow controller never waits on a retry.

use sqlx::SqlitePool;
use std::future::Future;
use tracing::{debug, warn};

use study_common::db::{self, SessionRecord, SessionUpdate};
use study_common::events::{EventBus, StudyEvent};
use study_common::{time, ParticipantId};

use crate::Result;

/// Persistent session table access
pub trait SessionStore {
    /// Insert-or-merge the participant's row; returns the stored row
    fn upsert(
        &self,
        participant_id: &ParticipantId,
        update: &SessionUpdate,
    ) -> impl Future<Output = Result<SessionRecord>> + Send;
}

/// Session store writing to the study database directly
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: SqlitePool,
}

impl SqliteSessionStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

impl SessionStore for SqliteSessionStore {
    async fn upsert(&self, participant_id: &ParticipantId, update: &SessionUpdate) -> Result<SessionRecord> {
        Ok(db::upsert_session(&self.db, participant_id, update).await?)
    }
}

/// Best-effort wrapper around a [`SessionStore`]
pub struct SessionRecorder<S> {
    store: S,
    events: EventBus,
}

impl<S: SessionStore> SessionRecorder<S> {
    pub fn new(store: S, events: EventBus) -> Self {
        Self { store, events }
    }

    /// Upsert the participant's session row
    ///
    /// Failures are logged and broadcast as `SessionWriteFailed` before being
    /// returned.
    pub async fn record(&self, participant_id: &ParticipantId, update: SessionUpdate) -> Result<SessionRecord> {
        match self.store.upsert(participant_id, &update).await {
            Ok(record) => {
                debug!(
                    participant_id = %participant_id,
                    stage = %record.stage,
                    return_count = record.return_count,
                    "Session recorded"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(participant_id = %participant_id, "Session write failed: {}", e);
                self.events.emit_lossy(StudyEvent::SessionWriteFailed {
                    participant_id: participant_id.clone(),
                    message: e.to_string(),
                    timestamp: time::now(),
                });
                Err(e)
            }
        }
    }
}
