//! Focus acquisition seam.
//!
//! Showing the bar kicks off a best-effort retry loop: the host environment
//! may not honor the first request while the panel is still materializing.
//! The capability lives behind a trait so the controller never branches on
//! platform details; the terminal implementation maps "front" to a repaint
//! and "focus" to parking the caret in the input row.

use crossbeam_channel::Sender;

use crate::writer::WriterMsg;

/// Retry delays after the bar becomes visible, in ms.
pub const FOCUS_RETRY_DELAYS_MS: [u64; 4] = [0, 50, 150, 400];

/// Raising the bar and directing input to it.
pub trait FocusDriver {
    fn bring_to_front(&mut self);
    fn acquire_focus(&mut self);
}

/// Terminal rendition: repaint over whatever the shell wrote, then put the
/// terminal cursor back in the input row.
pub struct TerminalFocus {
    writer_tx: Sender<WriterMsg>,
}

impl TerminalFocus {
    pub fn new(writer_tx: Sender<WriterMsg>) -> Self {
        Self { writer_tx }
    }
}

impl FocusDriver for TerminalFocus {
    fn bring_to_front(&mut self) {
        let _ = self.writer_tx.send(WriterMsg::RepaintLast);
    }

    fn acquire_focus(&mut self) {
        let _ = self.writer_tx.send(WriterMsg::ParkCursor);
    }
}
