//! Panel frame composition.
//!
//! Turns the current interaction state plus effect timing into a list of
//! fully styled lines for the writer to paint. The composer owns layout only;
//! it never touches the terminal.

use std::time::Duration;

use crate::effects::{self, SpanHighlight};
use crate::height::{display_width, wrap_text};
use crate::state::Affordance;
use crate::theme::ThemeColors;

/// Prompt marker at the left of the input row.
const PROMPT: &str = "› ";
/// Hint shown in an empty, enabled input row.
const PLACEHOLDER: &str = "Ask anything";
/// Copy affordance label, drawn right-aligned on its own row.
const COPY_LABEL: &str = "[ ctrl+y copy ]";

/// Everything the composer needs for one frame.
pub struct FrameInput<'a> {
    pub colors: &'a ThemeColors,
    /// Total panel width in columns.
    pub width: usize,
    /// Total panel rows to draw (animation driver output).
    pub rows: usize,
    pub input: &'a str,
    pub input_enabled: bool,
    pub display_text: &'a str,
    pub response_visible: bool,
    pub copy_visible: bool,
    /// Waiting for the first fragment; draw the dots instead of text.
    pub thinking: bool,
    pub errored: bool,
    pub affordance: Affordance,
    /// Time since the current affordance started, drives the sweep position.
    pub effect_elapsed: Duration,
}

/// One composed frame: styled lines top to bottom, plus where the terminal
/// cursor belongs inside the input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelFrame {
    pub lines: Vec<String>,
    /// Row of the input line, counted from the panel top.
    pub cursor_row: usize,
    /// Column of the caret inside that row (0-based).
    pub cursor_col: usize,
}

/// Maps border cells to positions along the panel perimeter, clockwise from
/// the top-left corner, so a highlight span can rotate around the box.
struct Perimeter {
    width: usize,
    rows: usize,
}

impl Perimeter {
    fn len(&self) -> usize {
        2 * self.width + 2 * self.rows.saturating_sub(2)
    }

    fn top(&self, col: usize) -> usize {
        col
    }

    fn right(&self, row: usize) -> usize {
        self.width + row.saturating_sub(1)
    }

    fn bottom(&self, col: usize) -> usize {
        self.width + self.rows.saturating_sub(2) + (self.width - 1 - col)
    }

    fn left(&self, row: usize) -> usize {
        2 * self.width + self.rows.saturating_sub(2) + (self.rows.saturating_sub(2) - row)
    }
}

/// Active border highlight for this frame, if any.
struct BorderGlow<'a> {
    span: SpanHighlight,
    color: &'a str,
    /// Shimmer runs along the top edge only; glow wraps the whole box.
    top_only: bool,
}

fn border_highlight<'a>(input: &FrameInput<'a>, perimeter: &Perimeter) -> Option<BorderGlow<'a>> {
    match input.affordance {
        Affordance::Shimmer => Some(BorderGlow {
            span: effects::shimmer_span(input.effect_elapsed, perimeter.width),
            color: input.colors.shimmer,
            top_only: true,
        }),
        Affordance::EdgeGlow => Some(BorderGlow {
            span: effects::glow_span(input.effect_elapsed, perimeter.len()),
            color: input.colors.glow,
            top_only: false,
        }),
        Affordance::None => None,
    }
}

fn border_color<'a>(
    glow: &Option<BorderGlow<'a>>,
    base: &'a str,
    index: usize,
    on_top: bool,
) -> &'a str {
    match glow {
        Some(glow) if (!glow.top_only || on_top) && glow.span.contains(index) => glow.color,
        _ => base,
    }
}

/// Horizontal border with per-cell highlight, emitting color codes only when
/// the color changes.
fn horizontal_border(
    input: &FrameInput<'_>,
    glow: &Option<BorderGlow<'_>>,
    perimeter: &Perimeter,
    top: bool,
) -> String {
    let colors = input.colors;
    let borders = colors.borders;
    let (open, fill, close) = if top {
        (borders.top_left, borders.horizontal, borders.top_right)
    } else {
        (borders.bottom_left, borders.horizontal, borders.bottom_right)
    };
    let mut line = String::new();
    let mut current = "";
    for col in 0..input.width {
        let index = if top {
            perimeter.top(col)
        } else {
            perimeter.bottom(col)
        };
        let color = border_color(glow, colors.border, index, top);
        if color != current {
            if !colors.reset.is_empty() && !current.is_empty() {
                line.push_str(colors.reset);
            }
            line.push_str(color);
            current = color;
        }
        if col == 0 {
            line.push(open);
        } else if col == input.width - 1 {
            line.push(close);
        } else {
            line.push(fill);
        }
    }
    line.push_str(colors.reset);
    line
}

/// Interior row: side borders around padded content.
fn content_row(
    input: &FrameInput<'_>,
    glow: &Option<BorderGlow<'_>>,
    perimeter: &Perimeter,
    row: usize,
    content: &str,
) -> String {
    let colors = input.colors;
    let vertical = colors.borders.vertical;
    let inner = input.width.saturating_sub(2);
    let pad = inner.saturating_sub(display_width(content));
    let left = border_color(glow, colors.border, perimeter.left(row), false);
    let right = border_color(glow, colors.border, perimeter.right(row), false);
    format!(
        "{left}{vertical}{reset}{content}{spaces}{right}{vertical}{reset}",
        reset = colors.reset,
        spaces = " ".repeat(pad),
    )
}

/// Separator between the input row and the response area.
fn separator_row(input: &FrameInput<'_>, glow: &Option<BorderGlow<'_>>, perimeter: &Perimeter, row: usize) -> String {
    let colors = input.colors;
    let borders = colors.borders;
    let left = border_color(glow, colors.border, perimeter.left(row), false);
    let right = border_color(glow, colors.border, perimeter.right(row), false);
    let mut line = String::new();
    line.push_str(left);
    line.push(borders.t_left);
    for _ in 0..input.width.saturating_sub(2) {
        line.push(borders.horizontal);
    }
    if right != left {
        line.push_str(colors.reset);
        line.push_str(right);
    }
    line.push(borders.t_right);
    line.push_str(colors.reset);
    line
}

fn input_row_content(input: &FrameInput<'_>, inner: usize) -> (String, usize) {
    let colors = input.colors;
    let prompt_width = display_width(PROMPT) + 1;
    let text_width = inner.saturating_sub(prompt_width);
    let mut content = String::new();
    content.push(' ');
    content.push_str(colors.accent);
    content.push_str(PROMPT);
    content.push_str(colors.reset);

    let cursor_col;
    if input.input.is_empty() && input.input_enabled {
        content.push_str(colors.dim);
        content.push_str(&truncate_to_width(PLACEHOLDER, text_width));
        content.push_str(colors.reset);
        cursor_col = 1 + prompt_width - 1;
    } else {
        // Keep the caret visible: show the tail when the input overflows.
        let shown = tail_to_width(input.input, text_width);
        let style = if input.input_enabled {
            colors.text
        } else {
            colors.dim
        };
        content.push_str(style);
        content.push_str(&shown);
        content.push_str(colors.reset);
        cursor_col = 1 + prompt_width - 1 + display_width(&shown);
    }
    (content, 1 + cursor_col)
}

fn truncate_to_width(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out
}

fn tail_to_width(text: &str, width: usize) -> String {
    if display_width(text) <= width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() && display_width(&chars.iter().collect::<String>()) > width {
        chars.remove(0);
    }
    chars.into_iter().collect()
}

/// Compose the full frame for the current state.
pub fn compose(input: &FrameInput<'_>) -> PanelFrame {
    let rows = input.rows.max(3);
    let width = input.width.max(8);
    let perimeter = Perimeter { width, rows };
    let glow = border_highlight(input, &perimeter);
    let inner = width.saturating_sub(2);
    let content_width = inner.saturating_sub(2);
    let colors = input.colors;

    let mut lines = Vec::with_capacity(rows);
    lines.push(horizontal_border(input, &glow, &perimeter, true));
    let (input_content, cursor_col) = input_row_content(input, inner);
    lines.push(content_row(input, &glow, &perimeter, 1, &input_content));

    // Interior rows between the input line and the bottom border.
    let mut remaining = rows.saturating_sub(3);
    if input.response_visible && remaining > 0 {
        lines.push(separator_row(input, &glow, &perimeter, lines.len()));
        remaining -= 1;

        let button_rows = usize::from(input.copy_visible && remaining > 1);
        let response_rows = remaining - button_rows;

        let body = if input.thinking {
            let dots = effects::thinking_dots(input.effect_elapsed);
            vec![format!(" {}Thinking{}{}", colors.dim, dots, colors.reset)]
        } else {
            let style = if input.errored { colors.error } else { colors.text };
            wrap_text(input.display_text, content_width)
                .into_iter()
                .map(|line| format!(" {style}{line}{reset}", reset = colors.reset))
                .collect()
        };
        // Scroll to the newest text when the response overflows its area.
        let skip = body.len().saturating_sub(response_rows);
        for row_text in body.iter().skip(skip).take(response_rows) {
            lines.push(content_row(input, &glow, &perimeter, lines.len(), row_text));
        }
        while lines.len() < rows - 1 - button_rows {
            lines.push(content_row(input, &glow, &perimeter, lines.len(), ""));
        }
        if button_rows == 1 {
            let pad = inner.saturating_sub(display_width(COPY_LABEL) + 1);
            let button = format!(
                "{spaces}{accent}{COPY_LABEL}{reset} ",
                spaces = " ".repeat(pad),
                accent = colors.accent,
                reset = colors.reset,
            );
            lines.push(content_row(input, &glow, &perimeter, lines.len(), &button));
        }
    } else {
        while lines.len() < rows - 1 {
            lines.push(content_row(input, &glow, &perimeter, lines.len(), ""));
        }
    }

    lines.push(horizontal_border(input, &glow, &perimeter, false));

    PanelFrame {
        lines,
        cursor_row: 1,
        cursor_col,
    }
}
