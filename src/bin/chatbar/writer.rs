//! Writer thread: sole owner of stdout.
//!
//! Every repaint goes through this thread so escape sequences never
//! interleave. The panel is anchored to the bottom of the terminal; the host
//! cursor position is saved before the first paint and restored when the
//! panel is cleared, so hiding the bar leaves the shell exactly where it was.

use std::io::{self, Write};
use std::thread::{self, JoinHandle};

use chatbar::log_debug;
use crossbeam_channel::Receiver;

use crate::frame::PanelFrame;

const SAVE_CURSOR: &str = "\x1b[s\x1b7";
const RESTORE_CURSOR: &str = "\x1b[u\x1b8";
const HIDE_CURSOR: &str = "\x1b[?25l";
const SHOW_CURSOR: &str = "\x1b[?25h";
const CLEAR_LINE: &str = "\x1b[2K";

/// Messages the rest of the app sends to the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterMsg {
    /// Paint (or repaint) the panel with this frame.
    ShowPanel(PanelFrame),
    /// Redraw the most recently shown frame (focus retry).
    RepaintLast,
    /// Move the terminal cursor back into the input row of the last frame.
    ParkCursor,
    /// Erase the panel and restore the saved host cursor.
    ClearPanel,
    /// Terminal dimensions changed.
    Resize { cols: u16, rows: u16 },
    /// Flush any cleanup and exit the thread.
    Shutdown,
}

/// First terminal row (1-based) the panel occupies.
pub fn panel_start_row(term_rows: u16, panel_rows: usize) -> u16 {
    let panel = panel_rows.min(term_rows as usize) as u16;
    term_rows.saturating_sub(panel) + 1
}

/// Rows that were painted last frame but fall outside the new panel. These
/// must be cleared or a shrinking panel leaves stale lines behind.
pub fn stale_rows(term_rows: u16, previous_rows: usize, current_rows: usize) -> Vec<u16> {
    if previous_rows <= current_rows {
        return Vec::new();
    }
    let old_start = panel_start_row(term_rows, previous_rows);
    let new_start = panel_start_row(term_rows, current_rows);
    (old_start..new_start).collect()
}

struct WriterState {
    term_cols: u16,
    term_rows: u16,
    /// Rows painted by the previous frame; 0 when the panel is hidden.
    painted_rows: usize,
    /// Whether the host cursor is currently saved (panel visible).
    cursor_saved: bool,
    /// Last frame shown, kept for focus-retry repaints.
    last_frame: Option<PanelFrame>,
    /// Where the caret was parked by the last draw (1-based row, col).
    last_cursor: Option<(u16, u16)>,
}

impl WriterState {
    fn new(cols: u16, rows: u16) -> Self {
        Self {
            term_cols: cols,
            term_rows: rows,
            painted_rows: 0,
            cursor_saved: false,
            last_frame: None,
            last_cursor: None,
        }
    }

    fn draw(&mut self, out: &mut impl Write, frame: &PanelFrame) -> io::Result<()> {
        let mut buf = String::new();
        if !self.cursor_saved {
            buf.push_str(SAVE_CURSOR);
            self.cursor_saved = true;
        }
        buf.push_str(HIDE_CURSOR);
        for row in stale_rows(self.term_rows, self.painted_rows, frame.lines.len()) {
            buf.push_str(&format!("\x1b[{row};1H{CLEAR_LINE}"));
        }
        let start = panel_start_row(self.term_rows, frame.lines.len());
        for (idx, line) in frame.lines.iter().enumerate() {
            let row = start + idx as u16;
            if row > self.term_rows {
                break;
            }
            buf.push_str(&format!("\x1b[{row};1H{CLEAR_LINE}{line}"));
        }
        // Park the terminal caret inside the input row.
        let cursor_row = start + frame.cursor_row as u16;
        let cursor_col = (frame.cursor_col as u16).min(self.term_cols.saturating_sub(1)) + 1;
        buf.push_str(&format!("\x1b[{cursor_row};{cursor_col}H"));
        buf.push_str(SHOW_CURSOR);
        self.painted_rows = frame.lines.len();
        self.last_frame = Some(frame.clone());
        self.last_cursor = Some((cursor_row, cursor_col));
        out.write_all(buf.as_bytes())?;
        out.flush()
    }

    fn repaint_last(&mut self, out: &mut impl Write) -> io::Result<()> {
        match self.last_frame.clone() {
            Some(frame) => self.draw(out, &frame),
            None => Ok(()),
        }
    }

    fn park_cursor(&mut self, out: &mut impl Write) -> io::Result<()> {
        let Some((row, col)) = self.last_cursor else {
            return Ok(());
        };
        out.write_all(format!("\x1b[{row};{col}H{SHOW_CURSOR}").as_bytes())?;
        out.flush()
    }

    fn clear(&mut self, out: &mut impl Write) -> io::Result<()> {
        if self.painted_rows == 0 && !self.cursor_saved {
            return Ok(());
        }
        let mut buf = String::new();
        let start = panel_start_row(self.term_rows, self.painted_rows);
        for row in start..=self.term_rows {
            buf.push_str(&format!("\x1b[{row};1H{CLEAR_LINE}"));
        }
        if self.cursor_saved {
            buf.push_str(RESTORE_CURSOR);
            self.cursor_saved = false;
        }
        buf.push_str(SHOW_CURSOR);
        self.painted_rows = 0;
        self.last_frame = None;
        self.last_cursor = None;
        out.write_all(buf.as_bytes())?;
        out.flush()
    }
}

/// Spawn the writer thread. It exits on `Shutdown` or when every sender is
/// dropped, clearing the panel on the way out.
pub fn spawn_writer_thread(rx: Receiver<WriterMsg>, cols: u16, rows: u16) -> JoinHandle<()> {
    thread::Builder::new()
        .name("chatbar-writer".into())
        .spawn(move || {
            let mut state = WriterState::new(cols, rows);
            let mut stdout = io::stdout();
            loop {
                match rx.recv() {
                    Ok(WriterMsg::ShowPanel(frame)) => {
                        if let Err(err) = state.draw(&mut stdout, &frame) {
                            log_debug(&format!("panel draw failed: {err}"));
                        }
                    }
                    Ok(WriterMsg::RepaintLast) => {
                        if let Err(err) = state.repaint_last(&mut stdout) {
                            log_debug(&format!("panel repaint failed: {err}"));
                        }
                    }
                    Ok(WriterMsg::ParkCursor) => {
                        if let Err(err) = state.park_cursor(&mut stdout) {
                            log_debug(&format!("cursor park failed: {err}"));
                        }
                    }
                    Ok(WriterMsg::ClearPanel) => {
                        if let Err(err) = state.clear(&mut stdout) {
                            log_debug(&format!("panel clear failed: {err}"));
                        }
                    }
                    Ok(WriterMsg::Resize { cols, rows }) => {
                        // Discard the old geometry; the next frame repaints fully.
                        let _ = state.clear(&mut stdout);
                        state.term_cols = cols;
                        state.term_rows = rows;
                    }
                    Ok(WriterMsg::Shutdown) | Err(_) => {
                        let _ = state.clear(&mut stdout);
                        break;
                    }
                }
            }
        })
        .expect("spawn writer thread")
}
