//! Stored row types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{BehavioralRecord, ParticipantId, Stage};
use crate::time;

/// One session row per participant, mutated in place across the flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub participant_id: ParticipantId,
    /// Run that last (re)initialised the row
    pub run_id: Uuid,
    /// Assigned condition (None only if a write arrived without one)
    pub condition_id: Option<String>,
    pub stage: Stage,
    pub return_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial session update
///
/// `None` fields leave the stored value untouched. A `run_id` different from
/// the stored one starts the row over (new run).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub run_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_count: Option<i64>,
    /// Client-side write time; later writes win
    #[serde(default = "time::now")]
    pub updated_at: DateTime<Utc>,
}

impl SessionUpdate {
    /// Empty update for `run_id`, stamped now
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            condition_id: None,
            stage: None,
            return_count: None,
            updated_at: time::now(),
        }
    }

    pub fn condition(mut self, condition_id: impl Into<String>) -> Self {
        self.condition_id = Some(condition_id.into());
        self
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn return_count(mut self, return_count: i64) -> Self {
        self.return_count = Some(return_count);
        self
    }

    pub fn at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }
}

/// One persisted questionnaire submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireResponse {
    pub participant_id: ParticipantId,
    #[serde(rename = "video_id")]
    pub condition_id: String,
    pub liked: bool,
    pub cart: bool,
    pub watch_time_ms: i64,
    pub completed: bool,
    pub return_count: i64,
    /// Answers keyed by question id
    pub answers: serde_json::Map<String, serde_json::Value>,
    #[serde(default = "time::now")]
    pub created_at: DateTime<Utc>,
}

impl QuestionnaireResponse {
    /// Combine the current behavioral record with the answers
    pub fn from_record(
        participant_id: ParticipantId,
        record: &BehavioralRecord,
        answers: serde_json::Map<String, serde_json::Value>,
        return_count: i64,
    ) -> Self {
        Self {
            participant_id,
            condition_id: record.condition_id.clone(),
            liked: record.like,
            cart: record.cart,
            watch_time_ms: record.watch_time_ms(),
            completed: record.completed,
            return_count,
            answers,
            created_at: time::now(),
        }
    }
}
