//! HTTP client for the study-store service
//!
//! Implements the counts, session and response seams over the store's REST
//! API for hosts that do not share a database with it.

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use study_common::config::StudyConfig;
use study_common::db::{QuestionnaireResponse, SessionRecord, SessionUpdate};
use study_common::{ConditionCount, ParticipantId};

use crate::assignment::CountsSource;
use crate::questionnaire::ResponseSink;
use crate::session::SessionStore;
use crate::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body returned by the store service
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreatedBody {
    id: Uuid,
}

/// Client for one store service instance
#[derive(Clone)]
pub struct StoreClient {
    http: Client,
    base_url: String,
}

impl StoreClient {
    /// Client for the service at `base_url` (e.g. `http://127.0.0.1:5780`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Client for the store named in the configuration
    pub fn from_config(config: &StudyConfig) -> Result<Self> {
        Self::new(config.store_base_url())
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The participant's session row, if one exists
    pub async fn session(&self, participant_id: &ParticipantId) -> Result<Option<SessionRecord>> {
        let response = self
            .http
            .get(self.url(&format!("/api/sessions/{}", participant_id)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl CountsSource for StoreClient {
    async fn condition_counts(&self) -> Result<Vec<ConditionCount>> {
        let response = self.http.get(self.url("/api/conditions/counts")).send().await?;
        let counts: Vec<ConditionCount> = check(response).await?.json().await?;
        debug!(conditions = counts.len(), "Fetched condition counts");
        Ok(counts)
    }
}

impl SessionStore for StoreClient {
    async fn upsert(&self, participant_id: &ParticipantId, update: &SessionUpdate) -> Result<SessionRecord> {
        let response = self
            .http
            .put(self.url(&format!("/api/sessions/{}", participant_id)))
            .json(update)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}

impl ResponseSink for StoreClient {
    async fn persist(&self, response: &QuestionnaireResponse) -> Result<Uuid> {
        let reply = self
            .http
            .post(self.url("/api/responses"))
            .json(response)
            .send()
            .await?;
        let created: CreatedBody = check(reply).await?.json().await?;
        Ok(created.id)
    }
}

/// Pass success responses through; turn anything else into `Error::Store`
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) if !body.message.is_empty() => body.message,
        _ => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    Err(Error::Store {
        status: status.as_u16(),
        message,
    })
}
