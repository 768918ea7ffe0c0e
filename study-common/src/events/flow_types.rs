//! Flow-related type definitions

use serde::{Deserialize, Serialize};

/// Participant-visible step of the study flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowStep {
    Start,
    Video,
    Questionnaire,
    /// Questionnaire submitted; only a new Start leaves this step
    Done,
}

impl std::fmt::Display for FlowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowStep::Start => write!(f, "start"),
            FlowStep::Video => write!(f, "video"),
            FlowStep::Questionnaire => write!(f, "questionnaire"),
            FlowStep::Done => write!(f, "done"),
        }
    }
}
