//! Audio priming on the Start gesture
//!
//! Some hosts only allow sound after a user gesture has started playback
//! once. The Start button is such a gesture, so the flow spends it on a
//! silent play/pause of a scratch element.

use tracing::debug;

use crate::playback::{MediaResource, PlayRejected};

pub trait AudioPrimer {
    fn prime(&mut self) -> Result<(), PlayRejected>;
}

/// Primes by briefly playing an unmuted scratch media element
pub struct MediaPrimer<M> {
    media: M,
}

impl<M: MediaResource> MediaPrimer<M> {
    pub fn new(media: M) -> Self {
        Self { media }
    }
}

impl<M: MediaResource> AudioPrimer for MediaPrimer<M> {
    fn prime(&mut self) -> Result<(), PlayRejected> {
        self.media.set_muted(false);
        let result = self.media.play();
        self.media.pause();
        if result.is_ok() {
            debug!("Audio primed");
        }
        result
    }
}
