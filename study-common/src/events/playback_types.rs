//! Playback-related type definitions
//!
//! Supporting types for the media lifecycle and its failure taxonomy.

use serde::{Deserialize, Serialize};

/// Media lifecycle phase
///
/// `Idle -> Loading -> {Playing <-> Buffering} -> Completed`, with `Error`
/// reachable from every phase before `Completed` and `Error -> Loading` on retry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    /// No resource mounted
    Idle,
    /// Resource mounted, waiting for the first play signal
    Loading,
    /// Media is advancing
    Playing,
    /// Stalled after playback had started
    Buffering,
    /// Natural end reached; terminal
    Completed,
    /// Load failed; waiting for a user retry
    Error,
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPhase::Idle => write!(f, "idle"),
            PlaybackPhase::Loading => write!(f, "loading"),
            PlaybackPhase::Playing => write!(f, "playing"),
            PlaybackPhase::Buffering => write!(f, "buffering"),
            PlaybackPhase::Completed => write!(f, "completed"),
            PlaybackPhase::Error => write!(f, "error"),
        }
    }
}

/// Fixed classification of playback load failures
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Fetch aborted by the user agent
    Aborted,
    /// Network failure while fetching
    Network,
    /// Resource fetched but could not be decoded
    Decode,
    /// No supported source or format
    UnsupportedFormat,
    /// Loading deadline elapsed without progress
    Timeout,
}

impl FailureKind {
    /// Key into the UI host's localized text table
    pub fn message_key(self) -> &'static str {
        match self {
            FailureKind::Aborted => "aborted",
            FailureKind::Network => "network",
            FailureKind::Decode => "decode",
            FailureKind::UnsupportedFormat => "unsupported",
            FailureKind::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Aborted => write!(f, "aborted"),
            FailureKind::Network => write!(f, "network"),
            FailureKind::Decode => write!(f, "decode"),
            FailureKind::UnsupportedFormat => write!(f, "unsupported-format"),
            FailureKind::Timeout => write!(f, "timeout"),
        }
    }
}
