//! Final-pass markdown rendering for settled responses.
//!
//! While a response is streaming the raw text is shown verbatim; once the
//! stream finishes the accumulated text gets one formatting pass through this
//! renderer, which converts markdown structure into ANSI-styled terminal
//! text. The pass is idempotent on plain text: running it again over text
//! with no markdown markers returns the same text.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

/// ANSI codes used by the renderer. `plain()` disables styling entirely
/// (used with `--no-color` and for width measurement sanity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownStyle {
    pub bold: &'static str,
    pub italic: &'static str,
    pub code: &'static str,
    pub heading: &'static str,
    pub quote: &'static str,
    pub reset: &'static str,
}

impl MarkdownStyle {
    pub fn ansi() -> Self {
        Self {
            bold: "\x1b[1m",
            italic: "\x1b[3m",
            code: "\x1b[36m",
            heading: "\x1b[1;4m",
            quote: "\x1b[2m",
            reset: "\x1b[0m",
        }
    }

    pub fn plain() -> Self {
        Self {
            bold: "",
            italic: "",
            code: "",
            heading: "",
            quote: "",
            reset: "",
        }
    }
}

struct Renderer {
    style: MarkdownStyle,
    out: String,
    active: Vec<&'static str>,
    list_stack: Vec<Option<u64>>,
}

impl Renderer {
    fn new(style: MarkdownStyle) -> Self {
        Self {
            style,
            out: String::new(),
            active: Vec::new(),
            list_stack: Vec::new(),
        }
    }

    fn push_style(&mut self, code: &'static str) {
        self.active.push(code);
        self.out.push_str(code);
    }

    fn pop_style(&mut self) {
        self.active.pop();
        if !self.style.reset.is_empty() {
            self.out.push_str(self.style.reset);
            for code in &self.active {
                self.out.push_str(code);
            }
        }
    }

    /// Start a new block with exactly one blank line before it.
    fn block_break(&mut self) {
        if self.out.is_empty() {
            return;
        }
        while self.out.ends_with('\n') {
            self.out.pop();
        }
        self.out.push_str("\n\n");
    }

    fn line_break(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Paragraph) => {
                if self.list_stack.is_empty() {
                    self.block_break();
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if self.list_stack.is_empty() {
                    self.out.push('\n');
                }
            }
            Event::Start(Tag::Heading { .. }) => {
                self.block_break();
                self.push_style(self.style.heading);
            }
            Event::End(TagEnd::Heading(_)) => {
                self.pop_style();
                self.out.push('\n');
            }
            Event::Start(Tag::Strong) => self.push_style(self.style.bold),
            Event::End(TagEnd::Strong) => self.pop_style(),
            Event::Start(Tag::Emphasis) => self.push_style(self.style.italic),
            Event::End(TagEnd::Emphasis) => self.pop_style(),
            Event::Start(Tag::BlockQuote(..)) => {
                self.block_break();
                self.push_style(self.style.quote);
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                self.pop_style();
                self.out.push('\n');
            }
            Event::Start(Tag::CodeBlock(_)) => {
                self.block_break();
                self.push_style(self.style.code);
            }
            Event::End(TagEnd::CodeBlock) => {
                self.pop_style();
                self.line_break();
            }
            Event::Start(Tag::List(start)) => {
                if self.list_stack.is_empty() {
                    self.block_break();
                }
                self.list_stack.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.line_break();
                }
            }
            Event::Start(Tag::Item) => {
                self.line_break();
                let depth = self.list_stack.len().saturating_sub(1);
                for _ in 0..depth {
                    self.out.push_str("  ");
                }
                match self.list_stack.last_mut() {
                    Some(Some(index)) => {
                        self.out.push_str(&format!("{index}. "));
                        *index += 1;
                    }
                    _ => self.out.push_str("• "),
                }
            }
            Event::End(TagEnd::Item) => self.line_break(),
            Event::Start(Tag::Link { .. }) | Event::End(TagEnd::Link) => {}
            Event::Text(text) => self.out.push_str(&text),
            Event::Code(text) => {
                self.push_style(self.style.code);
                self.out.push_str(&text);
                self.pop_style();
            }
            Event::SoftBreak | Event::HardBreak => self.out.push('\n'),
            Event::Rule => {
                self.block_break();
                self.out.push_str("────────");
                self.out.push('\n');
            }
            _ => {}
        }
    }
}

/// Render markdown `text` as ANSI-styled terminal text.
pub fn render(text: &str, style: MarkdownStyle) -> String {
    let parser = Parser::new_ext(text, Options::empty());
    let mut renderer = Renderer::new(style);
    for event in parser {
        renderer.handle(event);
    }
    let mut out = renderer.out;
    while out.ends_with('\n') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(render("hello there", MarkdownStyle::plain()), "hello there");
    }

    #[test]
    fn plain_pass_is_idempotent() {
        let input = "First paragraph with plain words.\n\nSecond paragraph.";
        let once = render(input, MarkdownStyle::plain());
        let twice = render(&once, MarkdownStyle::plain());
        assert_eq!(once, twice);
    }

    #[test]
    fn bold_gets_ansi_codes() {
        let out = render("this is **bold** text", MarkdownStyle::ansi());
        assert!(out.contains("\x1b[1m"));
        assert!(out.contains("bold"));
        assert!(out.contains("\x1b[0m"));
    }

    #[test]
    fn bold_markers_are_consumed_in_plain_mode() {
        assert_eq!(
            render("this is **bold** text", MarkdownStyle::plain()),
            "this is bold text"
        );
    }

    #[test]
    fn inline_code_is_styled() {
        let out = render("run `cargo test` now", MarkdownStyle::ansi());
        assert!(out.contains("\x1b[36mcargo test"));
    }

    #[test]
    fn unordered_list_gets_bullets() {
        let out = render("- one\n- two", MarkdownStyle::plain());
        assert_eq!(out, "• one\n• two");
    }

    #[test]
    fn ordered_list_keeps_numbering() {
        let out = render("1. first\n2. second", MarkdownStyle::plain());
        assert_eq!(out, "1. first\n2. second");
    }

    #[test]
    fn block_quote_is_styled_and_closed() {
        let out = render("> quoted words", MarkdownStyle::ansi());
        assert!(out.contains("\x1b[2m"));
        assert!(out.contains("quoted words"));
        assert!(out.ends_with("\x1b[0m") || out.ends_with("quoted words"));
    }

    #[test]
    fn block_quote_markers_are_consumed_in_plain_mode() {
        assert_eq!(
            render("> quoted words", MarkdownStyle::plain()),
            "quoted words"
        );
    }

    #[test]
    fn heading_becomes_its_own_line() {
        let out = render("# Title\n\nbody", MarkdownStyle::plain());
        assert_eq!(out, "Title\n\nbody");
    }

    #[test]
    fn nested_style_restores_outer_code() {
        // Bold containing italic: after the italic ends, bold must still apply.
        let out = render("**a *b* c**", MarkdownStyle::ansi());
        let after_italic = out
            .split("\x1b[3m")
            .nth(1)
            .expect("italic start present");
        assert!(after_italic.contains("\x1b[0m\x1b[1m"));
    }

    #[test]
    fn soft_breaks_preserve_lines() {
        assert_eq!(render("a\nb", MarkdownStyle::plain()), "a\nb");
    }
}
