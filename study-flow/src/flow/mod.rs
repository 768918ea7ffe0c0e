//! Experiment flow controller
//!
//! Sequences one participant through `Start -> Video -> Questionnaire -> Done`
//! with a single `Questionnaire -> Video` back-edge. All step changes go
//! through one transition function; side effects (assignment, session
//! writes, response persistence) are issued by the public operations around
//! it.

mod controller;
mod primer;
mod state;

pub use controller::ExperimentFlowController;
pub use primer::{AudioPrimer, MediaPrimer};
pub use state::{FlowAction, FlowState, RunToken};

use thiserror::Error;

use study_common::events::FlowStep;

use crate::playback::PlaybackError;

/// Flow operation failures
#[derive(Error, Debug)]
pub enum FlowError {
    /// The action is not legal in the current step; nothing changed
    #[error("Cannot {action} while in step {step}")]
    InvalidTransition { step: FlowStep, action: FlowAction },

    /// Required questions were left unanswered; nothing was written
    #[error("Missing answers for: {}", .0.join(", "))]
    MissingAnswers(Vec<String>),

    /// Response persistence failed; the questionnaire stays open for a retry
    #[error("Questionnaire submission failed: {0}")]
    SubmitFailed(#[source] crate::Error),

    /// A record for a different condition was offered to this run
    #[error("Record is for condition {got}, run is assigned {expected}")]
    ConditionMismatch { expected: String, got: String },

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}
