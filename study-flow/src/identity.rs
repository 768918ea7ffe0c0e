//! Participant identity
//!
//! One opaque identifier per device, kept in a client-local store under a
//! fixed key. Read on startup, generated and written once if absent.

use sqlx::SqlitePool;
use std::future::Future;
use tracing::{info, warn};
use uuid::Uuid;

use study_common::db::settings;
use study_common::ParticipantId;

use crate::Result;

/// Fixed key of the persisted participant identifier
pub const PARTICIPANT_KEY: &str = "participant_id";

/// Client-local string store
pub trait IdentityStore {
    /// Read the value under `key`
    fn read(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Write `value` unless `key` already has one; return the stored value
    fn write_once(&self, key: &str, value: &str) -> impl Future<Output = Result<String>> + Send;

    /// Replace whatever is stored under `key`
    fn overwrite(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Identity store backed by the `settings` table
#[derive(Clone)]
pub struct SqliteIdentityStore {
    db: SqlitePool,
}

impl SqliteIdentityStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

impl IdentityStore for SqliteIdentityStore {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(settings::get_setting::<String>(&self.db, key).await?)
    }

    async fn write_once(&self, key: &str, value: &str) -> Result<String> {
        Ok(settings::get_or_insert_setting(&self.db, key, value).await?)
    }

    async fn overwrite(&self, key: &str, value: &str) -> Result<()> {
        Ok(settings::set_setting(&self.db, key, value).await?)
    }
}

/// Supplies the stable participant identifier
pub struct IdentityProvider<S> {
    store: S,
}

impl<S: IdentityStore> IdentityProvider<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The stored identifier, creating it on first use
    ///
    /// A blank stored value is not a valid identifier and is replaced.
    pub async fn participant_id(&self) -> Result<ParticipantId> {
        match self.store.read(PARTICIPANT_KEY).await? {
            Some(existing) if !existing.trim().is_empty() => Ok(ParticipantId::new(existing)),
            Some(_) => {
                let fresh = Uuid::new_v4().to_string();
                warn!("Stored participant id is blank, replacing it");
                self.store.overwrite(PARTICIPANT_KEY, &fresh).await?;
                Ok(ParticipantId::new(fresh))
            }
            None => {
                let fresh = Uuid::new_v4().to_string();
                let stored = self.store.write_once(PARTICIPANT_KEY, &fresh).await?;
                info!(participant_id = %stored, "Generated participant id");
                Ok(ParticipantId::new(stored))
            }
        }
    }
}
