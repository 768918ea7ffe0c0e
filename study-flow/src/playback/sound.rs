//! Sound unlock
//!
//! Media starts muted so autoplay is allowed. Once the participant has
//! unmuted successfully, later videos in the same session try to start with
//! sound and fall back to muted if the element refuses.

use tracing::{debug, warn};

use super::media::MediaResource;

/// Session-scoped "participant already enabled sound" flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoundUnlock {
    unlocked: bool,
}

impl SoundUnlock {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn mark_unlocked(&mut self) {
        self.unlocked = true;
    }
}

/// Unmute and request playback; re-mutes and returns false on refusal
pub fn try_unmute<M: MediaResource>(media: &mut M) -> bool {
    media.set_muted(false);
    match media.play() {
        Ok(()) => {
            debug!("Playback unmuted");
            true
        }
        Err(e) => {
            warn!("Unmuted playback refused, staying muted: {}", e);
            media.set_muted(true);
            false
        }
    }
}
