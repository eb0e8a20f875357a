//! Interaction state machine for the chat bar.
//!
//! All visual behavior hangs off a single `VisualState`: the effects layer
//! derives its animations from it, the frame composer derives its layout from
//! it, and the event loop drives transitions through the methods here. The
//! state itself stays free of timing and drawing so the transitions can be
//! tested directly.

/// Lifecycle of one request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualState {
    /// No exchange in progress; input editable.
    #[default]
    Idle,
    /// Prompt submitted, no fragment received yet.
    Thinking,
    /// At least one fragment received, stream still open.
    Streaming,
    /// Stream finished (or failed); response text is final.
    Settled,
}

/// Which animated affordance the border should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    None,
    /// Typing feedback while the input has text.
    EdgeGlow,
    /// Waiting feedback while a request is pending.
    Shimmer,
}

/// Full interaction state of the bar.
#[derive(Debug, Default)]
pub struct ChatBarState {
    visual: VisualState,
    visible: bool,
    input: String,
    response: String,
    /// Markdown-rendered form of `response`, set once the stream settles.
    rendered: Option<String>,
    copy_available: bool,
    errored: bool,
}

impl ChatBarState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visual(&self) -> VisualState {
        self.visual
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn copy_available(&self) -> bool {
        self.copy_available
    }

    pub fn errored(&self) -> bool {
        self.errored
    }

    /// Raw accumulated response text (unstyled).
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Text the response area should draw: the rendered form once settled,
    /// the raw accumulation while streaming.
    pub fn display_text(&self) -> &str {
        match &self.rendered {
            Some(rendered) => rendered,
            None => &self.response,
        }
    }

    /// A request is in flight between submit and the terminal event.
    pub fn in_flight(&self) -> bool {
        matches!(self.visual, VisualState::Thinking | VisualState::Streaming)
    }

    /// The input line accepts edits whenever no request is in flight.
    pub fn input_enabled(&self) -> bool {
        !self.in_flight()
    }

    /// The response area exists once an exchange has started.
    pub fn response_area_visible(&self) -> bool {
        self.visual != VisualState::Idle
    }

    pub fn affordance(&self) -> Affordance {
        if self.visual == VisualState::Thinking {
            return Affordance::Shimmer;
        }
        if self.visible && self.input_enabled() && !self.input.is_empty() {
            return Affordance::EdgeGlow;
        }
        Affordance::None
    }

    /// Flip visibility. Hiding clears displayed content but does not abort an
    /// in-flight stream: fragments arriving while hidden accumulate into the
    /// cleared buffer, so reopening shows the stream from that point on.
    pub fn toggle(&mut self) -> bool {
        if self.visible {
            self.hide();
        } else {
            self.show();
        }
        self.visible
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.response.clear();
        self.rendered = None;
        self.copy_available = false;
        self.errored = false;
        if !self.in_flight() {
            self.visual = VisualState::Idle;
            self.input.clear();
        }
    }

    pub fn push_input(&mut self, ch: char) {
        if self.input_enabled() {
            self.input.push(ch);
        }
    }

    pub fn push_input_str(&mut self, text: &str) {
        if self.input_enabled() {
            self.input.push_str(text);
        }
    }

    pub fn backspace(&mut self) {
        if self.input_enabled() {
            self.input.pop();
        }
    }

    /// Take the current input as a prompt and enter `Thinking`.
    ///
    /// Returns `None` (and changes nothing) when the bar is hidden, the input
    /// is blank, or a request is already in flight - there is never more than
    /// one exchange running.
    pub fn submit(&mut self) -> Option<String> {
        if !self.visible || self.in_flight() {
            return None;
        }
        let prompt = self.input.trim().to_string();
        if prompt.is_empty() {
            return None;
        }
        self.visual = VisualState::Thinking;
        self.response.clear();
        self.rendered = None;
        self.copy_available = false;
        self.errored = false;
        Some(prompt)
    }

    /// Append one stream fragment. The first fragment moves `Thinking` to
    /// `Streaming`; order of arrival is order of display.
    pub fn on_chunk(&mut self, text: &str) {
        if !self.in_flight() {
            return;
        }
        self.visual = VisualState::Streaming;
        self.response.push_str(text);
    }

    /// Stream closed normally. Re-enables and clears the input.
    pub fn on_finished(&mut self) {
        if !self.in_flight() {
            return;
        }
        self.visual = VisualState::Settled;
        self.copy_available = !self.response.is_empty();
        self.input.clear();
    }

    /// Stream failed. The message replaces any partial response; the error
    /// text is not offered for copying.
    pub fn on_errored(&mut self, message: &str) {
        if !self.in_flight() {
            return;
        }
        self.visual = VisualState::Settled;
        self.response = message.to_string();
        self.rendered = None;
        self.copy_available = false;
        self.errored = true;
        self.input.clear();
    }

    /// Install the markdown-rendered form of the settled response.
    pub fn set_rendered(&mut self, rendered: String) {
        if self.visual == VisualState::Settled {
            self.rendered = Some(rendered);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible_bar_with_input(text: &str) -> ChatBarState {
        let mut state = ChatBarState::new();
        state.show();
        state.push_input_str(text);
        state
    }

    #[test]
    fn submit_enters_thinking_and_disables_input() {
        let mut state = visible_bar_with_input("hello");
        assert_eq!(state.submit().as_deref(), Some("hello"));
        assert_eq!(state.visual(), VisualState::Thinking);
        assert!(!state.input_enabled());
        assert_eq!(state.affordance(), Affordance::Shimmer);

        // Edits during the request are ignored.
        state.push_input('x');
        state.backspace();
        assert_eq!(state.input(), "hello");
    }

    #[test]
    fn blank_or_hidden_submit_is_refused() {
        let mut state = ChatBarState::new();
        state.push_input_str("hi");
        assert_eq!(state.submit(), None, "hidden bar must not submit");

        let mut state = visible_bar_with_input("   ");
        assert_eq!(state.submit(), None, "whitespace-only input must not submit");
        assert_eq!(state.visual(), VisualState::Idle);
    }

    #[test]
    fn resubmit_while_in_flight_is_refused() {
        let mut state = visible_bar_with_input("first");
        state.submit().unwrap();
        assert_eq!(state.submit(), None);
        state.on_chunk("partial");
        assert_eq!(state.submit(), None);
    }

    #[test]
    fn fragments_concatenate_in_arrival_order() {
        let mut state = visible_bar_with_input("hello");
        state.submit().unwrap();
        state.on_chunk("Hi");
        assert_eq!(state.visual(), VisualState::Streaming);
        state.on_chunk(" there");
        state.on_chunk("!");
        assert_eq!(state.display_text(), "Hi there!");
        state.on_finished();
        assert_eq!(state.visual(), VisualState::Settled);
        assert!(state.copy_available());
        assert!(state.input_enabled());
        assert_eq!(state.input(), "");
    }

    #[test]
    fn error_fragment_settles_without_copy() {
        let mut state = visible_bar_with_input("hello");
        state.submit().unwrap();
        state.on_errored("Error: could not connect to the completion server.");
        assert_eq!(state.visual(), VisualState::Settled);
        assert!(state.errored());
        assert!(!state.copy_available());
        assert!(state.input_enabled());
        assert!(state.display_text().starts_with("Error:"));
    }

    #[test]
    fn error_replaces_partial_response() {
        let mut state = visible_bar_with_input("hello");
        state.submit().unwrap();
        state.on_chunk("partial answer");
        state.on_errored("Error: stream interrupted");
        assert_eq!(state.display_text(), "Error: stream interrupted");
    }

    #[test]
    fn hide_clears_content_but_not_in_flight_stream() {
        let mut state = visible_bar_with_input("hello");
        state.submit().unwrap();
        state.on_chunk("before hide ");
        state.toggle();
        assert!(!state.visible());
        assert_eq!(state.response(), "");
        assert!(state.in_flight(), "hiding must not abort the stream");

        // Fragments that arrive while hidden accumulate from the clear point.
        state.on_chunk("after hide");
        state.toggle();
        assert!(state.visible());
        assert_eq!(state.display_text(), "after hide");
    }

    #[test]
    fn hide_when_idle_resets_everything() {
        let mut state = visible_bar_with_input("draft text");
        state.toggle();
        state.toggle();
        assert!(state.visible());
        assert_eq!(state.input(), "");
        assert_eq!(state.visual(), VisualState::Idle);
        assert!(!state.response_area_visible());
    }

    #[test]
    fn hide_after_settle_discards_response() {
        let mut state = visible_bar_with_input("hello");
        state.submit().unwrap();
        state.on_chunk("answer");
        state.on_finished();
        assert!(state.copy_available());
        state.toggle();
        assert!(!state.copy_available());
        state.toggle();
        assert_eq!(state.display_text(), "");
        assert_eq!(state.visual(), VisualState::Idle);
    }

    #[test]
    fn edge_glow_tracks_typed_input() {
        let mut state = ChatBarState::new();
        assert_eq!(state.affordance(), Affordance::None);
        state.show();
        assert_eq!(state.affordance(), Affordance::None);
        state.push_input('h');
        assert_eq!(state.affordance(), Affordance::EdgeGlow);
        state.backspace();
        assert_eq!(state.affordance(), Affordance::None);
    }

    #[test]
    fn rendered_text_is_preferred_once_settled() {
        let mut state = visible_bar_with_input("hello");
        state.submit().unwrap();
        state.on_chunk("**bold**");
        assert_eq!(state.display_text(), "**bold**");
        state.on_finished();
        state.set_rendered("\x1b[1mbold\x1b[0m".to_string());
        assert_eq!(state.display_text(), "\x1b[1mbold\x1b[0m");
    }

    #[test]
    fn set_rendered_ignored_while_streaming() {
        let mut state = visible_bar_with_input("hello");
        state.submit().unwrap();
        state.on_chunk("raw");
        state.set_rendered("styled".to_string());
        assert_eq!(state.display_text(), "raw");
    }

    #[test]
    fn terminal_events_after_settle_are_ignored() {
        let mut state = visible_bar_with_input("hello");
        state.submit().unwrap();
        state.on_chunk("done");
        state.on_finished();
        state.on_chunk("stray");
        state.on_errored("stray error");
        assert_eq!(state.display_text(), "done");
        assert!(state.copy_available());
    }
}
