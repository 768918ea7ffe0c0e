//! Event types for the study event system
//!
//! Provides shared event definitions and the EventBus used by the flow core.

mod flow_types;
mod playback_types;

pub use flow_types::FlowStep;
pub use playback_types::{FailureKind, PlaybackPhase};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::model::{BehavioralRecord, ParticipantId};

/// Study event types
///
/// Events are broadcast via EventBus and serialize with a `type` tag so UI
/// hosts can forward them unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StudyEvent {
    /// A condition was chosen for a new run
    ConditionAssigned {
        participant_id: ParticipantId,
        run_id: Uuid,
        condition_id: String,
        /// True when the counts source failed and a uniform pick was used
        fallback: bool,
        timestamp: DateTime<Utc>,
    },

    /// Flow moved between steps
    FlowStepChanged {
        participant_id: ParticipantId,
        old_step: FlowStep,
        new_step: FlowStep,
        timestamp: DateTime<Utc>,
    },

    /// Playback lifecycle phase changed
    PlaybackStateChanged {
        condition_id: String,
        old_phase: PlaybackPhase,
        new_phase: PlaybackPhase,
        timestamp: DateTime<Utc>,
    },

    /// Playback failed; the UI should show the message for `kind` and a retry
    PlaybackFailed {
        condition_id: String,
        kind: FailureKind,
        timestamp: DateTime<Utc>,
    },

    /// A viewing finished and produced its behavioral record
    ViewingCompleted {
        record: BehavioralRecord,
        timestamp: DateTime<Utc>,
    },

    /// Best-effort session bookkeeping failed
    SessionWriteFailed {
        participant_id: ParticipantId,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Questionnaire answers were persisted
    QuestionnaireSubmitted {
        participant_id: ParticipantId,
        response_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl StudyEvent {
    /// Event name for logging and SSE-style forwarding
    pub fn event_type(&self) -> &'static str {
        match self {
            StudyEvent::ConditionAssigned { .. } => "ConditionAssigned",
            StudyEvent::FlowStepChanged { .. } => "FlowStepChanged",
            StudyEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            StudyEvent::PlaybackFailed { .. } => "PlaybackFailed",
            StudyEvent::ViewingCompleted { .. } => "ViewingCompleted",
            StudyEvent::SessionWriteFailed { .. } => "SessionWriteFailed",
            StudyEvent::QuestionnaireSubmitted { .. } => "QuestionnaireSubmitted",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use study_common::events::{EventBus, FlowStep, StudyEvent};
/// use study_common::ParticipantId;
///
/// let bus = EventBus::new(100);
/// let mut rx = bus.subscribe();
///
/// bus.emit_lossy(StudyEvent::FlowStepChanged {
///     participant_id: ParticipantId::new("p-1"),
///     old_step: FlowStep::Start,
///     new_step: FlowStep::Video,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StudyEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<StudyEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: StudyEvent,
    ) -> Result<usize, broadcast::error::SendError<StudyEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: StudyEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
