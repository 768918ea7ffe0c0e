//! Pure playback transitions
//!
//! No timers or I/O here; the controller applies the returned [`Transition`].

use study_common::events::{FailureKind, PlaybackPhase};

use super::media::MediaSignal;

/// What a signal does to the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move to another phase
    Enter(PlaybackPhase),
    /// Move to `Error` with this classification
    Fail(FailureKind),
    /// Legal but no phase change
    Stay,
    /// Not meaningful in this phase
    Ignore,
}

/// Transition for a media signal
pub fn on_signal(phase: PlaybackPhase, signal: MediaSignal) -> Transition {
    use PlaybackPhase::*;

    match (phase, signal) {
        // Nothing is loaded yet, and nothing moves a finished viewing
        (Idle, _) | (Completed, _) => Transition::Ignore,

        // Only a retry leaves Error
        (Error, _) => Transition::Ignore,

        (_, MediaSignal::Error(code)) => Transition::Fail(code.failure_kind()),

        (Loading, MediaSignal::Playing) | (Buffering, MediaSignal::Playing) => Transition::Enter(Playing),

        // Stalling before the first frame is still Loading (falls through to Stay)
        (Playing, MediaSignal::Waiting) => Transition::Enter(Buffering),

        // A stall right before the end still finishes the viewing
        (Playing, MediaSignal::Ended) | (Buffering, MediaSignal::Ended) => {
            Transition::Enter(Completed)
        }
        (_, MediaSignal::Ended) => Transition::Ignore,

        _ => Transition::Stay,
    }
}

/// Transition when the loading deadline fires
pub fn on_deadline(phase: PlaybackPhase) -> Transition {
    match phase {
        PlaybackPhase::Loading => Transition::Fail(FailureKind::Timeout),
        _ => Transition::Ignore,
    }
}
