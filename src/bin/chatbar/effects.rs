//! Time-driven visual effects: thinking dots, border shimmer, edge glow.
//!
//! Everything here is a pure function of elapsed time so the event loop can
//! redraw at whatever cadence it likes and the tests can step a simulated
//! clock. The effects never mutate interaction state; they only decide what
//! the current frame should look like.

use std::time::Duration;

/// Dot advance cadence while waiting for the first fragment.
pub const THINKING_DOT_INTERVAL: Duration = Duration::from_millis(400);
/// One full shimmer sweep across the border.
pub const SHIMMER_PERIOD: Duration = Duration::from_millis(1500);
/// One full glow rotation around the border perimeter.
pub const GLOW_PERIOD: Duration = Duration::from_millis(2880);

/// Highlighted run of border cells, as perimeter indices. May wrap past the
/// perimeter length; consumers test membership with [`SpanHighlight::contains`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanHighlight {
    pub start: usize,
    pub len: usize,
    pub perimeter: usize,
}

impl SpanHighlight {
    pub fn contains(&self, index: usize) -> bool {
        if self.perimeter == 0 || self.len == 0 {
            return false;
        }
        let offset = (index + self.perimeter - self.start % self.perimeter) % self.perimeter;
        offset < self.len
    }
}

/// Thinking indicator: one to three dots advancing on a fixed cadence.
pub fn thinking_dots(elapsed: Duration) -> &'static str {
    let ticks = (elapsed.as_millis() / THINKING_DOT_INTERVAL.as_millis()) as usize;
    match ticks % 3 {
        0 => ".",
        1 => "..",
        _ => "...",
    }
}

fn phase(elapsed: Duration, period: Duration) -> f32 {
    let period_ms = period.as_millis().max(1);
    let into = elapsed.as_millis() % period_ms;
    into as f32 / period_ms as f32
}

/// Shimmer sweep position, `0.0..1.0` across one period.
pub fn shimmer_phase(elapsed: Duration) -> f32 {
    phase(elapsed, SHIMMER_PERIOD)
}

/// Glow rotation position, `0.0..1.0` around one period.
pub fn glow_phase(elapsed: Duration) -> f32 {
    phase(elapsed, GLOW_PERIOD)
}

/// Bright band sweeping along the top border while a request is pending.
pub fn shimmer_span(elapsed: Duration, top_width: usize) -> SpanHighlight {
    let len = (top_width / 5).max(3).min(top_width.max(1));
    let start = (shimmer_phase(elapsed) * top_width as f32) as usize;
    SpanHighlight {
        start: start.min(top_width.saturating_sub(1)),
        len,
        perimeter: top_width.max(1),
    }
}

/// Glow segment rotating around the whole border while the user types.
pub fn glow_span(elapsed: Duration, perimeter: usize) -> SpanHighlight {
    let len = (perimeter / 4).max(4).min(perimeter.max(1));
    let start = (glow_phase(elapsed) * perimeter as f32) as usize;
    SpanHighlight {
        start: start.min(perimeter.saturating_sub(1)),
        len,
        perimeter: perimeter.max(1),
    }
}
