//! Playback driver
//!
//! Applies [`machine`](super::machine) transitions to a live media element,
//! runs the loading deadline and settle delay, handles toggles, unmute and
//! retry, and returns the behavioral record once the viewing completes.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use study_common::config::PlaybackConfig;
use study_common::events::{EventBus, FailureKind, PlaybackPhase, StudyEvent};
use study_common::{time, BehavioralRecord, Condition, InteractionState};

use super::machine::{self, Transition};
use super::media::{cache_busted, MediaResource, MediaSignal};
use super::sound::{try_unmute, SoundUnlock};
use super::toggle::ToggleGuard;

/// Playback timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSettings {
    /// Time allowed in Loading without any progress signal
    pub loading_timeout: Duration,
    /// Delay between the end signal and emitting the record
    pub settle_delay: Duration,
    /// Minimum spacing of accepted like/cart toggles
    pub toggle_window: Duration,
}

impl From<&PlaybackConfig> for PlaybackSettings {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            loading_timeout: Duration::from_millis(config.loading_timeout_ms),
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            toggle_window: Duration::from_millis(config.toggle_window_ms),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self::from(&PlaybackConfig::default())
    }
}

/// User gesture forwarded by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    ToggleLike,
    ToggleCart,
    /// Explicit "enable sound" gesture
    UnmuteGesture,
    /// Reload after a failure
    Retry,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The host stopped delivering media signals before the viewing finished
    #[error("Media signals closed in phase {phase} before playback completed")]
    Detached {
        phase: PlaybackPhase,
        last_failure: Option<FailureKind>,
    },
}

/// Drives one viewing of one condition
///
/// Borrows the flow's interaction flags so toggles made here are the flags
/// the flow later restores on back-navigation, and the session's sound flag
/// so an unmute carries over to the next video.
pub struct PlaybackController<'a, M> {
    media: M,
    condition: Condition,
    settings: PlaybackSettings,
    interaction: &'a mut InteractionState,
    sound: &'a mut SoundUnlock,
    events: EventBus,

    phase: PlaybackPhase,
    loading_deadline: Option<Instant>,
    settle_at: Option<Instant>,
    like_guard: ToggleGuard,
    cart_guard: ToggleGuard,
    last_failure: Option<FailureKind>,

    /// Position and flags captured at the end signal
    end_position: f64,
    end_interaction: InteractionState,
}

impl<'a, M: MediaResource> PlaybackController<'a, M> {
    pub fn new(
        media: M,
        condition: Condition,
        settings: PlaybackSettings,
        interaction: &'a mut InteractionState,
        sound: &'a mut SoundUnlock,
        events: EventBus,
    ) -> Self {
        let like_guard = ToggleGuard::new(settings.toggle_window);
        let cart_guard = ToggleGuard::new(settings.toggle_window);
        let end_interaction = *interaction;

        Self {
            media,
            condition,
            settings,
            interaction,
            sound,
            events,
            phase: PlaybackPhase::Idle,
            loading_deadline: None,
            settle_at: None,
            like_guard,
            cart_guard,
            last_failure: None,
            end_position: 0.0,
            end_interaction,
        }
    }

    /// Mount the resource and run until the viewing completes
    ///
    /// Resolves exactly once: with the record after the settle delay, or
    /// with [`PlaybackError::Detached`] if `signals` closes first. Closing
    /// `commands` only stops gesture handling.
    pub async fn run(
        mut self,
        mut signals: mpsc::Receiver<MediaSignal>,
        mut commands: mpsc::Receiver<PlaybackCommand>,
    ) -> Result<BehavioralRecord, PlaybackError> {
        let locator = self.condition.locator.clone();
        self.load_source(&locator);

        let mut signals_open = true;
        let mut commands_open = true;

        loop {
            let settle_at = self.settle_at;
            let loading_deadline = self.loading_deadline;

            tokio::select! {
                biased;

                _ = wait_until(settle_at), if settle_at.is_some() => {
                    return Ok(self.finish());
                }

                _ = wait_until(loading_deadline), if loading_deadline.is_some() => {
                    self.loading_deadline = None;
                    self.apply(machine::on_deadline(self.phase));
                }

                signal = signals.recv(), if signals_open => match signal {
                    Some(signal) => self.handle_signal(signal),
                    None if self.phase == PlaybackPhase::Completed => signals_open = false,
                    None => return Err(self.detached()),
                },

                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command),
                    None => commands_open = false,
                },

                else => return Err(self.detached()),
            }
        }
    }

    fn handle_signal(&mut self, signal: MediaSignal) {
        if signal.is_progress() && self.loading_deadline.take().is_some() {
            debug!(condition_id = %self.condition.id, ?signal, "Loading deadline cancelled");
        }

        match machine::on_signal(self.phase, signal) {
            Transition::Ignore => {
                debug!(phase = %self.phase, ?signal, "Ignoring media signal");
            }
            transition => self.apply(transition),
        }
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Enter(PlaybackPhase::Playing) => {
                let first_frame = self.phase == PlaybackPhase::Loading;
                self.enter(PlaybackPhase::Playing);
                if first_frame && self.sound.is_unlocked() && self.media.is_muted() {
                    try_unmute(&mut self.media);
                }
            }
            Transition::Enter(PlaybackPhase::Completed) => {
                self.end_position = self.media.current_time();
                self.end_interaction = *self.interaction;
                self.enter(PlaybackPhase::Completed);
                self.settle_at = Some(Instant::now() + self.settings.settle_delay);
            }
            Transition::Enter(phase) => self.enter(phase),
            Transition::Fail(kind) => self.fail(kind),
            Transition::Stay | Transition::Ignore => {}
        }
    }

    fn handle_command(&mut self, command: PlaybackCommand) {
        if self.phase == PlaybackPhase::Completed {
            debug!(?command, "Viewing completed, ignoring command");
            return;
        }

        let now = Instant::now();
        match command {
            PlaybackCommand::ToggleLike => {
                if self.like_guard.admit(now) {
                    self.interaction.like_clicked = !self.interaction.like_clicked;
                    debug!(like = self.interaction.like_clicked, "Like toggled");
                } else {
                    debug!("Like toggle inside re-entrancy window, ignored");
                }
            }
            PlaybackCommand::ToggleCart => {
                if self.cart_guard.admit(now) {
                    self.interaction.cart_clicked = !self.interaction.cart_clicked;
                    debug!(cart = self.interaction.cart_clicked, "Cart toggled");
                } else {
                    debug!("Cart toggle inside re-entrancy window, ignored");
                }
            }
            PlaybackCommand::UnmuteGesture => {
                if try_unmute(&mut self.media) {
                    self.sound.mark_unlocked();
                }
            }
            PlaybackCommand::Retry => {
                if self.phase == PlaybackPhase::Error {
                    let locator = cache_busted(&self.condition.locator, time::now_millis());
                    info!(
                        condition_id = %self.condition.id,
                        previous_failure = ?self.last_failure,
                        "Retrying playback"
                    );
                    self.load_source(&locator);
                } else {
                    debug!(phase = %self.phase, "Retry outside Error phase, ignored");
                }
            }
        }
    }

    /// Reset the element onto `locator` muted from zero and enter Loading
    fn load_source(&mut self, locator: &str) {
        self.media.pause();
        self.media.load(locator);
        self.media.set_muted(true);
        self.media.rewind();
        self.end_position = 0.0;
        self.enter(PlaybackPhase::Loading);
        self.loading_deadline = Some(Instant::now() + self.settings.loading_timeout);

        if let Err(e) = self.media.play() {
            debug!("Muted play request not honoured yet: {}", e);
        }
    }

    fn fail(&mut self, kind: FailureKind) {
        self.loading_deadline = None;
        self.last_failure = Some(kind);
        warn!(
            condition_id = %self.condition.id,
            kind = %kind,
            "Playback failed"
        );
        self.enter(PlaybackPhase::Error);
        self.events.emit_lossy(StudyEvent::PlaybackFailed {
            condition_id: self.condition.id.clone(),
            kind,
            timestamp: time::now(),
        });
    }

    fn enter(&mut self, new_phase: PlaybackPhase) {
        if self.phase == new_phase {
            return;
        }
        let old_phase = self.phase;
        self.phase = new_phase;

        info!(
            condition_id = %self.condition.id,
            "Playback {} -> {}", old_phase, new_phase
        );
        self.events.emit_lossy(StudyEvent::PlaybackStateChanged {
            condition_id: self.condition.id.clone(),
            old_phase,
            new_phase,
            timestamp: time::now(),
        });
    }

    fn finish(&self) -> BehavioralRecord {
        let record = BehavioralRecord::completed_viewing(
            self.condition.id.clone(),
            self.end_interaction,
            self.end_position,
            self.media.duration(),
        );

        info!(
            condition_id = %record.condition_id,
            watch_duration = record.watch_duration,
            like = record.like,
            cart = record.cart,
            "Viewing completed"
        );
        self.events.emit_lossy(StudyEvent::ViewingCompleted {
            record: record.clone(),
            timestamp: time::now(),
        });
        record
    }

    fn detached(&self) -> PlaybackError {
        warn!(condition_id = %self.condition.id, phase = %self.phase, "Media signals closed early");
        PlaybackError::Detached {
            phase: self.phase,
            last_failure: self.last_failure,
        }
    }
}

async fn wait_until(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
