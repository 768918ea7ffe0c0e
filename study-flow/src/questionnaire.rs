//! Questionnaire persistence
//!
//! Answers are keyed by question id. A submission is only accepted when every
//! required question has a non-empty answer.

use sqlx::SqlitePool;
use std::future::Future;
use uuid::Uuid;

use study_common::db::{self, QuestionnaireResponse};

use crate::Result;

/// Answers keyed by question id
pub type Answers = serde_json::Map<String, serde_json::Value>;

/// Where questionnaire responses are written
pub trait ResponseSink {
    /// Persist one response; returns its id
    fn persist(&self, response: &QuestionnaireResponse) -> impl Future<Output = Result<Uuid>> + Send;
}

/// Response sink writing to the study database directly
#[derive(Clone)]
pub struct SqliteResponseSink {
    db: SqlitePool,
}

impl SqliteResponseSink {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

impl ResponseSink for SqliteResponseSink {
    async fn persist(&self, response: &QuestionnaireResponse) -> Result<Uuid> {
        Ok(db::insert_response(&self.db, response).await?)
    }
}

/// Required question ids with no usable answer, in the order given
///
/// `null`, empty strings and empty arrays count as unanswered.
pub fn missing_answers<'a>(answers: &Answers, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|id| !answers.get(*id).is_some_and(is_answered))
        .collect()
}

fn is_answered(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.trim().is_empty(),
        serde_json::Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
