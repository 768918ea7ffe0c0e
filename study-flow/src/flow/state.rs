//! Flow state

use uuid::Uuid;

use study_common::events::FlowStep;
use study_common::{BehavioralRecord, Condition};

use crate::questionnaire::Answers;

/// One pass through the study, from Start to submission
#[derive(Debug, Clone, PartialEq)]
pub struct RunToken {
    pub run_id: Uuid,
    pub condition: Condition,
    /// Questionnaire -> Video back-navigations in this run
    pub return_count: i64,
    /// Unsubmitted questionnaire answers, kept across back-navigation
    pub draft: Answers,
}

impl RunToken {
    pub fn new(condition: Condition) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            condition,
            return_count: 0,
            draft: Answers::new(),
        }
    }
}

/// Current step plus the data that step owns
///
/// At most one behavioral record exists per run. It is kept across a
/// back-navigation so the interaction flags can be restored, and replaced
/// when the video completes again.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FlowState {
    #[default]
    Start,
    Video {
        run: RunToken,
        record: Option<BehavioralRecord>,
    },
    Questionnaire {
        run: RunToken,
        record: BehavioralRecord,
    },
    Done {
        run: RunToken,
        record: BehavioralRecord,
    },
}

impl FlowState {
    pub fn step(&self) -> FlowStep {
        match self {
            FlowState::Start => FlowStep::Start,
            FlowState::Video { .. } => FlowStep::Video,
            FlowState::Questionnaire { .. } => FlowStep::Questionnaire,
            FlowState::Done { .. } => FlowStep::Done,
        }
    }

    pub fn run(&self) -> Option<&RunToken> {
        match self {
            FlowState::Start => None,
            FlowState::Video { run, .. }
            | FlowState::Questionnaire { run, .. }
            | FlowState::Done { run, .. } => Some(run),
        }
    }

    pub fn record(&self) -> Option<&BehavioralRecord> {
        match self {
            FlowState::Start => None,
            FlowState::Video { record, .. } => record.as_ref(),
            FlowState::Questionnaire { record, .. } | FlowState::Done { record, .. } => Some(record),
        }
    }

    /// Whether `action` is legal from this state
    ///
    /// Start is accepted only before a run or after one finished, so a host
    /// re-issuing it mid-run cannot trigger a second assignment. Restart is
    /// the explicit way out of an unfinished run.
    pub fn accepts(&self, action: FlowAction) -> bool {
        matches!(
            (self, action),
            (FlowState::Start | FlowState::Done { .. }, FlowAction::Start)
                | (FlowState::Video { .. }, FlowAction::CompleteVideo)
                | (FlowState::Questionnaire { .. }, FlowAction::BackToVideo)
                | (FlowState::Questionnaire { .. }, FlowAction::SaveDraft)
                | (FlowState::Questionnaire { .. }, FlowAction::Submit)
                | (_, FlowAction::Restart)
        )
    }
}

/// Participant-level actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowAction {
    Start,
    CompleteVideo,
    BackToVideo,
    SaveDraft,
    Submit,
    Restart,
}

impl std::fmt::Display for FlowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowAction::Start => write!(f, "start"),
            FlowAction::CompleteVideo => write!(f, "complete video"),
            FlowAction::BackToVideo => write!(f, "go back to video"),
            FlowAction::SaveDraft => write!(f, "save answers"),
            FlowAction::Submit => write!(f, "submit"),
            FlowAction::Restart => write!(f, "restart"),
        }
    }
}
