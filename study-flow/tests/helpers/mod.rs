//! Shared fakes for study-flow integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use study_common::db::{QuestionnaireResponse, SessionRecord, SessionUpdate};
use study_common::events::StudyEvent;
use study_common::{Condition, ConditionCatalog, ConditionCount, ParticipantId};
use study_flow::assignment::CountsSource;
use study_flow::playback::{MediaResource, PlayRejected};
use study_flow::questionnaire::ResponseSink;
use study_flow::session::SessionStore;
use study_flow::{Error, Result};
use tokio::sync::broadcast;
use uuid::Uuid;

/// What the fake element has been asked to do
#[derive(Debug, Default)]
pub struct MediaState {
    pub loads: Vec<String>,
    pub play_calls: usize,
    pub pause_calls: usize,
    pub rewinds: usize,
    pub muted: bool,
    pub position: f64,
    pub duration: f64,
    /// Refuse play requests while unmuted (autoplay policy)
    pub refuse_unmuted: bool,
}

/// Scriptable media element; clones share state
#[derive(Clone)]
pub struct FakeMedia {
    pub state: Arc<Mutex<MediaState>>,
}

impl FakeMedia {
    pub fn new(duration: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(MediaState {
                duration,
                ..MediaState::default()
            })),
        }
    }

    pub fn set_position(&self, position: f64) {
        self.state.lock().unwrap().position = position;
    }

    pub fn refuse_unmuted(&self, refuse: bool) {
        self.state.lock().unwrap().refuse_unmuted = refuse;
    }

    pub fn muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    pub fn loads(&self) -> Vec<String> {
        self.state.lock().unwrap().loads.clone()
    }
}

impl MediaResource for FakeMedia {
    fn load(&mut self, locator: &str) {
        self.state.lock().unwrap().loads.push(locator.to_string());
    }

    fn play(&mut self) -> std::result::Result<(), PlayRejected> {
        let mut state = self.state.lock().unwrap();
        state.play_calls += 1;
        if state.refuse_unmuted && !state.muted {
            return Err(PlayRejected("NotAllowedError".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().unwrap().pause_calls += 1;
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    fn rewind(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.rewinds += 1;
        state.position = 0.0;
    }

    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> f64 {
        self.state.lock().unwrap().duration
    }
}

pub fn catalog() -> Arc<ConditionCatalog> {
    let conditions = ["P306_C", "P306_M", "P312_C", "P318_C"]
        .iter()
        .map(|id| Condition::new(*id, format!("https://media.test/{}/index.m3u8", id)))
        .collect();
    Arc::new(ConditionCatalog::new(conditions).unwrap())
}

/// Counts source that records how often it was asked
#[derive(Clone, Default)]
pub struct CountingSource {
    pub calls: Arc<AtomicUsize>,
    pub fail: bool,
}

impl CountingSource {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CountsSource for CountingSource {
    async fn condition_counts(&self) -> Result<Vec<ConditionCount>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Store {
                status: 503,
                message: "counts offline".to_string(),
            });
        }
        Ok(vec![
            ConditionCount {
                condition_id: "P306_C".to_string(),
                count: 3,
            },
            ConditionCount {
                condition_id: "P306_M".to_string(),
                count: 3,
            },
            ConditionCount {
                condition_id: "P312_C".to_string(),
                count: 1,
            },
            ConditionCount {
                condition_id: "P318_C".to_string(),
                count: 3,
            },
        ])
    }
}

/// Session store that always fails
pub struct BrokenSessionStore;

impl SessionStore for BrokenSessionStore {
    async fn upsert(&self, _: &ParticipantId, _: &SessionUpdate) -> Result<SessionRecord> {
        Err(Error::Store {
            status: 500,
            message: "session table unavailable".to_string(),
        })
    }
}

/// In-memory response sink that can be switched to failing
#[derive(Clone, Default)]
pub struct SwitchableSink {
    pub fail: Arc<AtomicBool>,
    pub saved: Arc<Mutex<Vec<QuestionnaireResponse>>>,
}

impl SwitchableSink {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn saved(&self) -> Vec<QuestionnaireResponse> {
        self.saved.lock().unwrap().clone()
    }
}

impl ResponseSink for SwitchableSink {
    async fn persist(&self, response: &QuestionnaireResponse) -> Result<Uuid> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Store {
                status: 502,
                message: "upstream unavailable".to_string(),
            });
        }
        self.saved.lock().unwrap().push(response.clone());
        Ok(Uuid::new_v4())
    }
}

/// Drain every event currently buffered on `rx`
pub fn drain(rx: &mut broadcast::Receiver<StudyEvent>) -> Vec<StudyEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Let the receiving side process what was just sent
pub async fn pause() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}
