//! Adaptive pacing of render signals for streamed text.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::ThrottleConfig;

/// What the caller should do after new text arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Render now and check again after `next_check`.
    RenderNow { next_check: Duration },
    /// A timer is pending; the text will be rendered when it fires.
    Deferred,
}

/// Accumulates text and decides when a full re-render is due.
///
/// The first fragment renders immediately and arms a single timer whose
/// delay grows with the accumulated length. Fragments arriving while the
/// timer is pending only mark the text dirty.
#[derive(Debug)]
pub struct OutputThrottle {
    config: ThrottleConfig,
    text: String,
    chars: usize,
    deadline: Option<Instant>,
    dirty: bool,
}

impl OutputThrottle {
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            text: String::new(),
            chars: 0,
            deadline: None,
            dirty: false,
        }
    }

    /// Append a fragment received at `now`.
    pub fn push(&mut self, fragment: &str, now: Instant) -> Pace {
        self.text.push_str(fragment);
        self.chars += fragment.chars().count();

        if self.deadline.is_some() {
            self.dirty = true;
            return Pace::Deferred;
        }

        let next_check = self.config.delay_for(self.chars);
        self.deadline = Some(now + next_check);
        self.dirty = false;
        Pace::RenderNow { next_check }
    }

    /// The pending timer fired. Returns true if a render is due.
    ///
    /// No new timer is armed; the next fragment renders immediately.
    pub fn timer_fired(&mut self) -> bool {
        self.deadline = None;
        std::mem::take(&mut self.dirty)
    }

    /// Disarm the timer and return the complete text for a final render.
    pub fn finalize(&mut self) -> String {
        self.deadline = None;
        self.dirty = false;
        self.text.clone()
    }

    /// Deadline of the pending timer.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn timer_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Accumulated text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Accumulated length in characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }
}
