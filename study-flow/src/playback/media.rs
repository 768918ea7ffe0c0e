//! Media element seam

use thiserror::Error;

use study_common::events::FailureKind;

/// The element refused to start playback (autoplay or gesture policy)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Play request rejected: {0}")]
pub struct PlayRejected(pub String);

/// Element error codes, numbered as media elements report them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorCode {
    Aborted,
    Network,
    Decode,
    SrcNotSupported,
}

impl MediaErrorCode {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(MediaErrorCode::Aborted),
            2 => Some(MediaErrorCode::Network),
            3 => Some(MediaErrorCode::Decode),
            4 => Some(MediaErrorCode::SrcNotSupported),
            _ => None,
        }
    }

    pub fn failure_kind(self) -> FailureKind {
        match self {
            MediaErrorCode::Aborted => FailureKind::Aborted,
            MediaErrorCode::Network => FailureKind::Network,
            MediaErrorCode::Decode => FailureKind::Decode,
            MediaErrorCode::SrcNotSupported => FailureKind::UnsupportedFormat,
        }
    }
}

/// Lifecycle signal raised by the media element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSignal {
    LoadStart,
    LoadedMetadata,
    LoadedData,
    CanPlay,
    CanPlayThrough,
    /// Data is still arriving
    Progress,
    Playing,
    /// Playback stalled waiting for data
    Waiting,
    Ended,
    Error(MediaErrorCode),
}

impl MediaSignal {
    /// Signals that prove the resource is loading; any of them cancels the
    /// loading deadline
    pub fn is_progress(self) -> bool {
        matches!(
            self,
            MediaSignal::LoadedMetadata
                | MediaSignal::LoadedData
                | MediaSignal::CanPlay
                | MediaSignal::CanPlayThrough
                | MediaSignal::Progress
                | MediaSignal::Playing
        )
    }
}

/// Handle on the media element the host renders
///
/// Calls are synchronous requests; outcomes arrive later as [`MediaSignal`]s.
pub trait MediaResource {
    /// Point the element at `locator` and begin fetching
    fn load(&mut self, locator: &str);

    /// Request playback
    fn play(&mut self) -> Result<(), PlayRejected>;

    fn pause(&mut self);

    fn set_muted(&mut self, muted: bool);

    fn is_muted(&self) -> bool;

    /// Seek to position zero
    fn rewind(&mut self);

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Resource length in seconds; not finite while unknown
    fn duration(&self) -> f64;
}

/// `locator` with any query replaced by a cache-busting parameter
pub fn cache_busted(locator: &str, stamp: i64) -> String {
    let base = locator.split('?').next().unwrap_or(locator);
    format!("{}?cb={}", base, stamp)
}
