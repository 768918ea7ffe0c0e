//! Playback controller
//!
//! Drives one media resource through
//! `Idle -> Loading -> Playing <-> Buffering -> Completed`, with `Error`
//! reachable from any pre-completed phase and left only by an explicit retry.
//! Completion produces exactly one [`BehavioralRecord`](study_common::BehavioralRecord).
//!
//! The host owns the actual media element. It feeds element events in as
//! [`MediaSignal`]s and user gestures as [`PlaybackCommand`]s; the controller
//! calls back into the element through [`MediaResource`].

mod controller;
mod machine;
mod media;
mod sound;
mod toggle;

pub use controller::{PlaybackCommand, PlaybackController, PlaybackError, PlaybackSettings};
pub use machine::{on_deadline, on_signal, Transition};
pub use media::{cache_busted, MediaErrorCode, MediaResource, MediaSignal, PlayRejected};
pub use sound::{try_unmute, SoundUnlock};
pub use toggle::ToggleGuard;
