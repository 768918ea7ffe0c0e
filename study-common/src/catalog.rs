//! Condition catalog
//!
//! The static list of treatment conditions a participant can be assigned to.
//! Loaded once at startup from configuration and immutable afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::{ConditionEntry, StorageConfig};
use crate::{Error, Result};

/// A treatment condition: stable id plus the media locator to play
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Stable identifier written to session and response rows
    #[serde(rename = "video_id")]
    pub id: String,
    /// Where the media resource is fetched from
    #[serde(rename = "video_url")]
    pub locator: String,
}

impl Condition {
    pub fn new(id: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            locator: locator.into(),
        }
    }
}

/// Immutable, non-empty set of conditions
#[derive(Debug, Clone)]
pub struct ConditionCatalog {
    conditions: Vec<Condition>,
}

impl ConditionCatalog {
    /// Build a catalog, rejecting an empty list and duplicate ids
    pub fn new(conditions: Vec<Condition>) -> Result<Self> {
        if conditions.is_empty() {
            return Err(Error::Config("Condition catalog is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for condition in &conditions {
            if !seen.insert(condition.id.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate condition id in catalog: {}",
                    condition.id
                )));
            }
        }

        Ok(Self { conditions })
    }

    /// Build locators from the storage location and each entry's object path
    ///
    /// Locator format: `{base_url}/storage/v1/object/public/{bucket}/{object_path}`
    pub fn from_config(storage: &StorageConfig, entries: &[ConditionEntry]) -> Result<Self> {
        let base = storage.base_url.trim_end_matches('/');
        if base.is_empty() {
            return Err(Error::Config(
                "storage.base_url is not set (config file or STUDY_BASE_URL)".to_string(),
            ));
        }

        let conditions = entries
            .iter()
            .map(|entry| {
                Condition::new(
                    entry.id.clone(),
                    format!(
                        "{}/storage/v1/object/public/{}/{}",
                        base,
                        storage.bucket,
                        entry.object_path.trim_start_matches('/')
                    ),
                )
            })
            .collect();

        Self::new(conditions)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn get(&self, id: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Always false; an empty catalog cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}
