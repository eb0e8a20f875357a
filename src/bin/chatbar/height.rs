//! Height measurement and animation for the overlay panel.
//!
//! The panel's total height is always derived, never stored: measure the
//! wrapped response text at the panel's content width, clamp it to the
//! response-area bounds, then add the fixed chrome rows. The animation
//! driver interpolates the drawn height toward that target; a new target
//! supersedes any in-flight animation (last-writer-wins).

use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthChar;

/// Smallest response area, in rows.
pub const MIN_RESPONSE_ROWS: usize = 1;
/// Height animation duration.
pub const HEIGHT_ANIMATION: Duration = Duration::from_millis(140);
/// Deltas below this many rows are suppressed entirely - re-measurement is
/// scheduled asynchronously and often lands twice with the same result, so
/// tiny deltas must not restart the animation.
pub const ANIMATION_THRESHOLD_ROWS: f32 = 1.0;

/// Top border + input row + bottom border.
const BASE_CHROME_ROWS: usize = 3;
/// Separator between input and response when the response area is shown.
const SEPARATOR_ROWS: usize = 1;
/// Copy-button row when the copy affordance is visible.
const BUTTON_ROWS: usize = 1;

/// Panel height when the response area is hidden (input bar only).
pub fn collapsed_panel_rows() -> usize {
    BASE_CHROME_ROWS
}

/// Display width of `text`, skipping ANSI escape sequences.
pub fn display_width(text: &str) -> usize {
    let mut width = 0usize;
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if chars.peek() == Some(&'[') {
                for seq_ch in chars.by_ref() {
                    if seq_ch != '[' && seq_ch.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }
    width
}

fn wrap_line(line: &str, width: usize, out: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_width = 0usize;
    // SGR codes in effect at the scan position. Re-opened at the start of
    // each continuation line so a styled span survives the wrap.
    let mut active = String::new();
    // Byte offset just past the most recent space, the display width consumed
    // up to it, and the styling active there - the candidate break point.
    let mut break_at: Option<(usize, usize, String)> = None;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            let mut seq = String::from(ch);
            if chars.peek() == Some(&'[') {
                for seq_ch in chars.by_ref() {
                    seq.push(seq_ch);
                    if seq_ch != '[' && seq_ch.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            if seq.ends_with('m') {
                if seq == "\x1b[0m" || seq == "\x1b[m" {
                    active.clear();
                } else {
                    active.push_str(&seq);
                }
            }
            current.push_str(&seq);
            continue;
        }
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if current_width + ch_width > width && current_width > 0 {
            if ch == ' ' {
                out.push(std::mem::take(&mut current));
                current = active.clone();
                current_width = 0;
                break_at = None;
                continue;
            }
            if let Some((byte_idx, width_at, style_at)) = break_at.take() {
                let carried = current.split_off(byte_idx);
                let mut head = std::mem::take(&mut current);
                while head.ends_with(' ') {
                    head.pop();
                }
                out.push(head);
                current_width -= width_at;
                current = style_at;
                current.push_str(&carried);
            } else {
                // One unbroken word wider than the panel: hard break.
                out.push(std::mem::take(&mut current));
                current = active.clone();
                current_width = 0;
            }
            break_at = None;
        }
        current.push(ch);
        current_width += ch_width;
        if ch == ' ' {
            break_at = Some((current.len(), current_width, active.clone()));
        }
    }
    out.push(current);
}

/// Word-wrap `text` to `width` columns. ANSI escapes pass through with zero
/// width; SGR codes still open at a break are re-emitted at the start of the
/// next line. Always returns at least one line.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![String::new()];
    }
    let mut out = Vec::new();
    for line in text.split('\n') {
        wrap_line(line, width, &mut out);
    }
    out
}

/// Rows the response area wants for `text`, clamped to its bounds.
pub fn response_rows(text: &str, width: usize, max_rows: usize) -> usize {
    let rows = wrap_text(text, width).len();
    rows.clamp(MIN_RESPONSE_ROWS, max_rows.max(MIN_RESPONSE_ROWS))
}

/// Total panel rows for the current content and affordance visibility.
///
/// Spacing varies with the copy button: the button row only exists once a
/// response has settled.
pub fn target_panel_rows(
    text: &str,
    content_width: usize,
    button_visible: bool,
    max_rows: usize,
) -> usize {
    let response = response_rows(text, content_width, max_rows);
    let mut chrome = BASE_CHROME_ROWS + SEPARATOR_ROWS;
    if button_visible {
        chrome += BUTTON_ROWS;
    }
    response + chrome
}

fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[derive(Debug, Clone, Copy)]
struct HeightAnimation {
    start: f32,
    target: f32,
    started_at: Instant,
    duration: Duration,
}

impl HeightAnimation {
    fn value_at(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.started_at);
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.target;
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        self.start + (self.target - self.start) * ease_in_out_cubic(t)
    }

    fn finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= self.duration
    }
}

/// Drives the drawn panel height toward requested targets.
#[derive(Debug)]
pub struct HeightDriver {
    current: f32,
    animation: Option<HeightAnimation>,
}

impl HeightDriver {
    pub fn new(initial_rows: usize) -> Self {
        Self {
            current: initial_rows as f32,
            animation: None,
        }
    }

    /// Request a new target height. Supersedes any in-flight animation,
    /// starting from wherever the height currently is. Sub-threshold deltas
    /// are suppressed so repeated identical measurements cause no motion.
    pub fn request(&mut self, target_rows: usize, now: Instant) {
        let current = self.value(now);
        self.current = current;
        let target = target_rows as f32;
        if (target - current).abs() < ANIMATION_THRESHOLD_ROWS {
            self.animation = None;
            return;
        }
        self.animation = Some(HeightAnimation {
            start: current,
            target,
            started_at: now,
            duration: HEIGHT_ANIMATION,
        });
    }

    /// Jump straight to `rows` with no animation (hide/show resets).
    pub fn snap(&mut self, rows: usize) {
        self.current = rows as f32;
        self.animation = None;
    }

    fn value(&self, now: Instant) -> f32 {
        match &self.animation {
            Some(animation) => animation.value_at(now),
            None => self.current,
        }
    }

    /// Advance the animation and return the height to draw.
    pub fn tick(&mut self, now: Instant) -> usize {
        if let Some(animation) = self.animation {
            self.current = animation.value_at(now);
            if animation.finished(now) {
                self.current = animation.target;
                self.animation = None;
            }
        }
        self.current.round() as usize
    }

    pub fn animating(&self) -> bool {
        self.animation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: usize = 40;
    const MAX_ROWS: usize = 12;

    #[test]
    fn empty_text_measures_minimum() {
        assert_eq!(response_rows("", WIDTH, MAX_ROWS), MIN_RESPONSE_ROWS);
    }

    #[test]
    fn long_text_clamps_to_maximum() {
        let text = "word ".repeat(2000);
        assert_eq!(response_rows(&text, WIDTH, MAX_ROWS), MAX_ROWS);
    }

    #[test]
    fn measurement_is_idempotent() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(8);
        let first = target_panel_rows(&text, WIDTH, true, MAX_ROWS);
        let second = target_panel_rows(&text, WIDTH, true, MAX_ROWS);
        assert_eq!(first, second);
    }

    #[test]
    fn button_row_adds_one_row_of_chrome() {
        let without = target_panel_rows("hi", WIDTH, false, MAX_ROWS);
        let with = target_panel_rows("hi", WIDTH, true, MAX_ROWS);
        assert_eq!(with, without + 1);
    }

    #[test]
    fn clamped_target_stays_bounded_for_any_length() {
        for len in [0usize, 1, 10, 100, 1000, 10_000] {
            let text = "x".repeat(len);
            let rows = response_rows(&text, WIDTH, MAX_ROWS);
            assert!((MIN_RESPONSE_ROWS..=MAX_ROWS).contains(&rows), "len {len}");
        }
    }

    #[test]
    fn wrap_breaks_at_word_boundaries() {
        let lines = wrap_text("alpha beta gamma delta", 11);
        assert_eq!(lines, vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn wrap_hard_breaks_oversized_words() {
        let lines = wrap_text("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn wrap_preserves_explicit_newlines() {
        let lines = wrap_text("a\n\nb", 10);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn wrap_ignores_ansi_escape_width() {
        let lines = wrap_text("\x1b[1mbold\x1b[0m text", 9);
        assert_eq!(lines.len(), 1);
        assert_eq!(display_width(&lines[0]), 9);
    }

    #[test]
    fn wrap_reopens_styles_on_continuation_lines() {
        let lines = wrap_text("\x1b[1malpha beta gamma\x1b[0m", 6);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("\x1b[1m"));
        assert!(lines[2].starts_with("\x1b[1m"));
        assert_eq!(display_width(&lines[1]), 4);
    }

    #[test]
    fn wrap_does_not_reopen_styles_after_reset() {
        let lines = wrap_text("\x1b[1mbold\x1b[0m plain words", 5);
        assert_eq!(
            lines,
            vec!["\x1b[1mbold\x1b[0m", "plain", "words"]
        );
    }

    #[test]
    fn display_width_excludes_ansi() {
        assert_eq!(display_width("hello"), 5);
        assert_eq!(display_width("\x1b[91mhello\x1b[0m"), 5);
        assert_eq!(display_width("\x1b[38;2;255;0;0mred\x1b[0m"), 3);
    }

    #[test]
    fn driver_reaches_target_after_duration() {
        let start = Instant::now();
        let mut driver = HeightDriver::new(3);
        driver.request(10, start);
        assert!(driver.animating());
        assert_eq!(driver.tick(start + HEIGHT_ANIMATION), 10);
        assert!(!driver.animating());
    }

    #[test]
    fn driver_interpolates_monotonically_upward() {
        let start = Instant::now();
        let mut driver = HeightDriver::new(3);
        driver.request(10, start);
        let mut last = 3;
        for step in 0..=10 {
            let at = start + HEIGHT_ANIMATION.mul_f32(step as f32 / 10.0);
            let value = driver.tick(at);
            assert!(value >= last, "height went backwards at step {step}");
            last = value;
        }
        assert_eq!(last, 10);
    }

    #[test]
    fn new_request_supersedes_in_flight_animation() {
        let start = Instant::now();
        let mut driver = HeightDriver::new(3);
        driver.request(10, start);
        let midpoint = start + HEIGHT_ANIMATION / 2;
        let mid_value = driver.tick(midpoint);
        driver.request(4, midpoint);
        // The new animation starts from the interpolated position, not from 3.
        let immediately = driver.tick(midpoint);
        assert_eq!(immediately, mid_value);
        assert_eq!(driver.tick(midpoint + HEIGHT_ANIMATION), 4);
    }

    #[test]
    fn sub_threshold_delta_is_suppressed() {
        let start = Instant::now();
        let mut driver = HeightDriver::new(5);
        driver.request(5, start);
        assert!(!driver.animating());
        assert_eq!(driver.tick(start), 5);
    }

    #[test]
    fn snap_discards_animation() {
        let start = Instant::now();
        let mut driver = HeightDriver::new(3);
        driver.request(10, start);
        driver.snap(3);
        assert!(!driver.animating());
        assert_eq!(driver.tick(start + HEIGHT_ANIMATION), 3);
    }
}
