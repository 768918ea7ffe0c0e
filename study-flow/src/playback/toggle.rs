//! Re-entrancy guard for like/cart toggles

use std::time::Duration;
use tokio::time::Instant;

/// Admits at most one toggle per window
#[derive(Debug, Clone)]
pub struct ToggleGuard {
    window: Duration,
    last: Option<Instant>,
}

impl ToggleGuard {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// True if a toggle at `now` should be applied
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
