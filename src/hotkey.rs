//! Debounce for the global toggle chord.
//!
//! The terminal reports a held chord as a stream of repeated key events. The
//! detector turns that stream into a single toggle per press: the first event
//! fires, repeats inside the hold window are swallowed, and a fresh press
//! after the window fires again.

use std::time::{Duration, Instant};

/// How long after a chord event further repeats are treated as the same press.
/// OS initial auto-repeat kicks in anywhere from ~300ms to ~660ms after the
/// key goes down, so the window must outlast that first gap; once repeats are
/// flowing each one extends the window.
pub const CHORD_HOLD_WINDOW: Duration = Duration::from_millis(600);

/// Turns raw chord key events into debounced toggle events.
#[derive(Debug)]
pub struct ChordDetector {
    hold_window: Duration,
    last_event_at: Option<Instant>,
}

impl ChordDetector {
    pub fn new() -> Self {
        Self::with_hold_window(CHORD_HOLD_WINDOW)
    }

    pub fn with_hold_window(hold_window: Duration) -> Self {
        Self {
            hold_window,
            last_event_at: None,
        }
    }

    /// Record a chord key event at `now`. Returns true when this event should
    /// emit a toggle (i.e. it is a press transition, not a held repeat).
    pub fn on_chord(&mut self, now: Instant) -> bool {
        let fire = match self.last_event_at {
            Some(last) => now.duration_since(last) >= self.hold_window,
            None => true,
        };
        // Every repeat extends the hold window so a continuously held chord
        // never re-fires.
        self.last_event_at = Some(now);
        fire
    }
}

impl Default for ChordDetector {
    fn default() -> Self {
        Self::new()
    }
}
