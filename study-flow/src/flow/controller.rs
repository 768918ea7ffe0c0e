//! Flow controller
//!
//! Owns the participant's flow state, interaction flags and sound flag, and
//! coordinates assignment, playback, session bookkeeping and questionnaire
//! persistence. Operations are sequential: `&mut self` rules out two running
//! at once.

use std::mem;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use study_common::db::{QuestionnaireResponse, SessionUpdate};
use study_common::events::{EventBus, StudyEvent};
use study_common::{time, BehavioralRecord, Condition, InteractionState, ParticipantId, Stage};

use super::primer::AudioPrimer;
use super::state::{FlowAction, FlowState, RunToken};
use super::FlowError;
use crate::assignment::{ConditionAssignmentBalancer, CountsSource};
use crate::playback::{
    MediaResource, MediaSignal, PlaybackCommand, PlaybackController, PlaybackSettings, SoundUnlock,
};
use crate::questionnaire::{missing_answers, Answers, ResponseSink};
use crate::session::{SessionRecorder, SessionStore};

/// Step change request carrying its payload
enum Transition {
    Start(RunToken),
    CompleteVideo(BehavioralRecord),
    BackToVideo,
    Submit,
    Restart,
}

impl Transition {
    fn action(&self) -> FlowAction {
        match self {
            Transition::Start(_) => FlowAction::Start,
            Transition::CompleteVideo(_) => FlowAction::CompleteVideo,
            Transition::BackToVideo => FlowAction::BackToVideo,
            Transition::Submit => FlowAction::Submit,
            Transition::Restart => FlowAction::Restart,
        }
    }
}

pub struct ExperimentFlowController<C, S, R, P> {
    participant_id: ParticipantId,
    balancer: ConditionAssignmentBalancer<C>,
    sessions: SessionRecorder<S>,
    responses: R,
    primer: P,
    playback: PlaybackSettings,
    events: EventBus,

    state: FlowState,
    interaction: InteractionState,
    sound: SoundUnlock,
}

impl<C, S, R, P> ExperimentFlowController<C, S, R, P>
where
    C: CountsSource,
    S: SessionStore,
    R: ResponseSink,
    P: AudioPrimer,
{
    pub fn new(
        participant_id: ParticipantId,
        balancer: ConditionAssignmentBalancer<C>,
        sessions: SessionRecorder<S>,
        responses: R,
        primer: P,
        playback: PlaybackSettings,
        events: EventBus,
    ) -> Self {
        Self {
            participant_id,
            balancer,
            sessions,
            responses,
            primer,
            playback,
            events,
            state: FlowState::Start,
            interaction: InteractionState::cleared(),
            sound: SoundUnlock::default(),
        }
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn interaction(&self) -> InteractionState {
        self.interaction
    }

    pub fn sound_unlocked(&self) -> bool {
        self.sound.is_unlocked()
    }

    /// Answers saved so far in the current run
    pub fn draft_answers(&self) -> Option<&Answers> {
        self.state.run().map(|run| &run.draft)
    }

    /// Condition of the current run
    pub fn condition(&self) -> Option<&Condition> {
        self.state.run().map(|run| &run.condition)
    }

    /// Begin a new run: prime audio, assign a condition, open the session
    ///
    /// Exactly one assignment is requested per accepted call. Returns the
    /// assigned condition.
    pub async fn start(&mut self) -> Result<Condition, FlowError> {
        self.ensure(FlowAction::Start)?;

        if let Err(e) = self.primer.prime() {
            warn!("Audio priming failed, continuing muted: {}", e);
        }

        self.interaction = InteractionState::cleared();

        let assignment = self.balancer.assign().await;
        let run = RunToken::new(assignment.condition);
        let run_id = run.run_id;
        let condition = run.condition.clone();

        self.events.emit_lossy(StudyEvent::ConditionAssigned {
            participant_id: self.participant_id.clone(),
            run_id,
            condition_id: condition.id.clone(),
            fallback: assignment.fallback,
            timestamp: time::now(),
        });

        self.transition(Transition::Start(run))?;

        self.record_session(
            SessionUpdate::new(run_id)
                .condition(condition.id.clone())
                .stage(Stage::Assigned)
                .return_count(0),
        )
        .await;

        Ok(condition)
    }

    /// Play the assigned video to completion, then advance to the questionnaire
    ///
    /// Toggles and unmute gestures arriving on `commands` update this
    /// controller's interaction and sound flags.
    pub async fn run_video_stage<M: MediaResource>(
        &mut self,
        media: M,
        signals: mpsc::Receiver<MediaSignal>,
        commands: mpsc::Receiver<PlaybackCommand>,
    ) -> Result<BehavioralRecord, FlowError> {
        self.ensure(FlowAction::CompleteVideo)?;
        let condition = match self.condition() {
            Some(condition) => condition.clone(),
            None => return Err(self.invalid(FlowAction::CompleteVideo)),
        };

        let record = PlaybackController::new(
            media,
            condition,
            self.playback.clone(),
            &mut self.interaction,
            &mut self.sound,
            self.events.clone(),
        )
        .run(signals, commands)
        .await?;

        self.complete_video(record.clone()).await?;
        Ok(record)
    }

    /// Accept the record of a finished viewing and open the questionnaire
    pub async fn complete_video(&mut self, record: BehavioralRecord) -> Result<(), FlowError> {
        self.ensure(FlowAction::CompleteVideo)?;
        if let Some(run) = self.state.run() {
            if run.condition.id != record.condition_id {
                return Err(FlowError::ConditionMismatch {
                    expected: run.condition.id.clone(),
                    got: record.condition_id,
                });
            }
        }

        self.transition(Transition::CompleteVideo(record))?;

        if let Some(update) = self.run_update(Stage::VideoComplete) {
            self.record_session(update).await;
        }
        Ok(())
    }

    /// Return from the questionnaire to the same video
    ///
    /// Restores the like/cart flags of the current record and counts the
    /// return. No new assignment is made.
    pub async fn back_to_video(&mut self) -> Result<(), FlowError> {
        self.ensure(FlowAction::BackToVideo)?;
        self.transition(Transition::BackToVideo)?;

        if let Some(run) = self.state.run() {
            let update = SessionUpdate::new(run.run_id).return_count(run.return_count);
            self.record_session(update).await;
        }
        Ok(())
    }

    /// Keep the participant's partial answers for this run
    ///
    /// The draft survives a back-navigation to the video and is dropped by
    /// Start and Restart. Nothing is written to the store.
    pub fn save_draft(&mut self, answers: Answers) -> Result<(), FlowError> {
        self.ensure(FlowAction::SaveDraft)?;
        if let FlowState::Questionnaire { run, .. } = &mut self.state {
            run.draft = answers;
            return Ok(());
        }
        Err(self.invalid(FlowAction::SaveDraft))
    }

    /// Persist the questionnaire answers together with the behavioral record
    ///
    /// Rejected without any write if a required answer is missing. If the
    /// response cannot be persisted the flow stays on the questionnaire.
    pub async fn submit(&mut self, answers: Answers, required: &[&str]) -> Result<Uuid, FlowError> {
        self.ensure(FlowAction::Submit)?;

        let missing = missing_answers(&answers, required);
        if !missing.is_empty() {
            return Err(FlowError::MissingAnswers(
                missing.into_iter().map(str::to_string).collect(),
            ));
        }

        let (record, return_count) = match &self.state {
            FlowState::Questionnaire { run, record } => (record, run.return_count),
            _ => return Err(self.invalid(FlowAction::Submit)),
        };
        let response = QuestionnaireResponse::from_record(
            self.participant_id.clone(),
            record,
            answers,
            return_count,
        );

        let response_id = match self.responses.persist(&response).await {
            Ok(id) => id,
            Err(e) => {
                error!(participant_id = %self.participant_id, "Response not saved: {}", e);
                return Err(FlowError::SubmitFailed(e));
            }
        };

        info!(participant_id = %self.participant_id, %response_id, "Questionnaire submitted");
        self.events.emit_lossy(StudyEvent::QuestionnaireSubmitted {
            participant_id: self.participant_id.clone(),
            response_id,
            timestamp: time::now(),
        });

        self.transition(Transition::Submit)?;

        if let Some(update) = self.run_update(Stage::QuestionnaireComplete) {
            if self.sessions.record(&self.participant_id, update).await.is_err() {
                error!(
                    participant_id = %self.participant_id,
                    %response_id,
                    "Response saved but session not marked complete"
                );
            }
        }

        Ok(response_id)
    }

    /// Abandon the current run and return to Start
    pub fn restart(&mut self) -> Result<(), FlowError> {
        self.transition(Transition::Restart)
    }

    fn ensure(&self, action: FlowAction) -> Result<(), FlowError> {
        if self.state.accepts(action) {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: FlowAction) -> FlowError {
        FlowError::InvalidTransition {
            step: self.state.step(),
            action,
        }
    }

    /// The single place the flow state changes
    fn transition(&mut self, transition: Transition) -> Result<(), FlowError> {
        let action = transition.action();
        self.ensure(action)?;

        let old_step = self.state.step();
        let previous = mem::take(&mut self.state);

        self.state = match (previous, transition) {
            (_, Transition::Restart) => {
                self.interaction = InteractionState::cleared();
                FlowState::Start
            }
            (FlowState::Start | FlowState::Done { .. }, Transition::Start(run)) => {
                FlowState::Video { run, record: None }
            }
            (FlowState::Video { run, .. }, Transition::CompleteVideo(record)) => {
                FlowState::Questionnaire { run, record }
            }
            (FlowState::Questionnaire { mut run, record }, Transition::BackToVideo) => {
                run.return_count += 1;
                self.interaction = record.interaction();
                FlowState::Video {
                    run,
                    record: Some(record),
                }
            }
            (FlowState::Questionnaire { run, record }, Transition::Submit) => {
                FlowState::Done { run, record }
            }
            (previous, _) => {
                self.state = previous;
                return Err(self.invalid(action));
            }
        };

        let new_step = self.state.step();
        info!(
            participant_id = %self.participant_id,
            "Flow {} -> {}", old_step, new_step
        );
        self.events.emit_lossy(StudyEvent::FlowStepChanged {
            participant_id: self.participant_id.clone(),
            old_step,
            new_step,
            timestamp: time::now(),
        });
        Ok(())
    }

    fn run_update(&self, stage: Stage) -> Option<SessionUpdate> {
        self.state.run().map(|run| {
            SessionUpdate::new(run.run_id)
                .condition(run.condition.id.clone())
                .stage(stage)
                .return_count(run.return_count)
        })
    }

    /// Best-effort session write; the recorder already logs failures
    async fn record_session(&self, update: SessionUpdate) {
        let _ = self.sessions.record(&self.participant_id, update).await;
    }
}
