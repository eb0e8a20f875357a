//! Raw stdin reader thread.
//!
//! The terminal is in raw mode, so every keystroke arrives as bytes. A
//! dedicated thread blocks on stdin and translates bytes into `InputEvent`s
//! for the main loop. Parsing is split out as a pure function over byte
//! chunks so the translation can be tested without a terminal.

use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use chatbar::log_debug;
use crossbeam_channel::Sender;

/// Keystrokes the main loop reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Ctrl+Space - the toggle chord (arrives as NUL in raw mode).
    Chord,
    /// Enter - submit the current input.
    Submit,
    Backspace,
    /// Printable text, UTF-8 decoded.
    Text(String),
    /// Ctrl+Y - copy the settled response.
    Copy,
    /// Esc - hide the bar.
    Hide,
    /// Ctrl+Q or Ctrl+C - quit the program.
    Exit,
}

/// Holds the trailing bytes of an incomplete UTF-8 sequence between reads.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn push(&mut self, bytes: &[u8], out: &mut String) {
        self.pending.extend_from_slice(bytes);
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        // Invalid bytes: drop them and keep decoding.
                        Some(len) => {
                            self.pending.drain(..valid + len);
                        }
                        // Incomplete tail: keep it for the next read.
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn is_csi_final(byte: u8) -> bool {
    (0x40..=0x7e).contains(&byte)
}

/// Translate one raw byte chunk into events. `carry` persists across calls
/// so multibyte characters split over reads decode correctly.
pub fn parse_bytes(carry: &mut Utf8Carry, bytes: &[u8]) -> Vec<InputEvent> {
    let mut events = Vec::new();
    let mut text = String::new();
    let mut idx = 0;
    while idx < bytes.len() {
        let byte = bytes[idx];
        match byte {
            0x00 => {
                flush_text(&mut text, &mut events);
                events.push(InputEvent::Chord);
                idx += 1;
            }
            b'\r' | b'\n' => {
                flush_text(&mut text, &mut events);
                events.push(InputEvent::Submit);
                idx += 1;
            }
            0x7f | 0x08 => {
                flush_text(&mut text, &mut events);
                events.push(InputEvent::Backspace);
                idx += 1;
            }
            0x19 => {
                flush_text(&mut text, &mut events);
                events.push(InputEvent::Copy);
                idx += 1;
            }
            0x11 | 0x03 => {
                flush_text(&mut text, &mut events);
                events.push(InputEvent::Exit);
                idx += 1;
            }
            0x1b => {
                flush_text(&mut text, &mut events);
                // A lone Esc hides the bar; Esc followed by a bracket is the
                // start of a terminal sequence (arrows, function keys) which
                // the bar ignores.
                match bytes.get(idx + 1) {
                    Some(b'[') => {
                        idx += 2;
                        while idx < bytes.len() && !is_csi_final(bytes[idx]) {
                            idx += 1;
                        }
                        idx += 1;
                    }
                    Some(b'O') => {
                        idx += 3;
                    }
                    _ => {
                        events.push(InputEvent::Hide);
                        idx += 1;
                    }
                }
            }
            b if b < 0x20 => {
                // Other control bytes: ignore.
                idx += 1;
            }
            _ => {
                let start = idx;
                while idx < bytes.len() && bytes[idx] >= 0x20 && bytes[idx] != 0x7f {
                    idx += 1;
                }
                carry.push(&bytes[start..idx], &mut text);
            }
        }
    }
    flush_text(&mut text, &mut events);
    events
}

fn flush_text(text: &mut String, events: &mut Vec<InputEvent>) {
    if !text.is_empty() {
        events.push(InputEvent::Text(std::mem::take(text)));
    }
}

/// Spawn the stdin reader. Exits when stdin closes or the receiver hangs up.
pub fn spawn_input_thread(tx: Sender<InputEvent>) -> JoinHandle<()> {
    thread::Builder::new()
        .name("chatbar-input".into())
        .spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut carry = Utf8Carry::default();
            let mut buf = [0u8; 256];
            loop {
                let read = match stdin.read(&mut buf) {
                    Ok(0) => {
                        log_debug("stdin closed; input thread exiting");
                        break;
                    }
                    Ok(n) => n,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        log_debug(&format!("stdin read failed: {err}"));
                        break;
                    }
                };
                for event in parse_bytes(&mut carry, &buf[..read]) {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
            }
        })
        .expect("spawn input thread")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8]) -> Vec<InputEvent> {
        parse_bytes(&mut Utf8Carry::default(), bytes)
    }

    #[test]
    fn printable_text_then_enter() {
        assert_eq!(
            parse(b"hi\r"),
            vec![InputEvent::Text("hi".into()), InputEvent::Submit]
        );
    }

    #[test]
    fn nul_byte_is_the_toggle_chord() {
        assert_eq!(parse(&[0x00]), vec![InputEvent::Chord]);
    }

    #[test]
    fn control_keys_map_to_events() {
        assert_eq!(parse(&[0x7f]), vec![InputEvent::Backspace]);
        assert_eq!(parse(&[0x19]), vec![InputEvent::Copy]);
        assert_eq!(parse(&[0x11]), vec![InputEvent::Exit]);
        assert_eq!(parse(&[0x03]), vec![InputEvent::Exit]);
    }

    #[test]
    fn lone_escape_hides() {
        assert_eq!(parse(&[0x1b]), vec![InputEvent::Hide]);
    }

    #[test]
    fn arrow_key_sequences_are_ignored() {
        assert_eq!(parse(b"\x1b[A"), vec![]);
        assert_eq!(parse(b"\x1b[1;5C"), vec![]);
        assert_eq!(parse(b"\x1bOP"), vec![]);
    }

    #[test]
    fn escape_before_text_still_hides() {
        assert_eq!(
            parse(b"\x1bq"),
            vec![InputEvent::Hide, InputEvent::Text("q".into())]
        );
    }

    #[test]
    fn multibyte_char_split_across_reads() {
        let mut carry = Utf8Carry::default();
        let bytes = "é".as_bytes();
        assert_eq!(parse_bytes(&mut carry, &bytes[..1]), vec![]);
        assert_eq!(
            parse_bytes(&mut carry, &bytes[1..]),
            vec![InputEvent::Text("é".into())]
        );
    }

    #[test]
    fn invalid_bytes_are_dropped() {
        let events = parse_bytes(&mut Utf8Carry::default(), &[0xff, b'a']);
        assert_eq!(events, vec![InputEvent::Text("a".into())]);
    }

    #[test]
    fn mixed_chunk_preserves_order() {
        assert_eq!(
            parse(b"ab\x7fc\r"),
            vec![
                InputEvent::Text("ab".into()),
                InputEvent::Backspace,
                InputEvent::Text("c".into()),
                InputEvent::Submit,
            ]
        );
    }
}
