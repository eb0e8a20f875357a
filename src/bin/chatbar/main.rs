//! ChatBar: a hotkey-toggled chat overlay for a local completion server.
//!
//! The main loop multiplexes three sources over crossbeam channels: raw
//! keystrokes from the input thread, stream events from the request worker,
//! and an idle tick that advances animations and drains deferred work. All
//! drawing goes through the writer thread; all interaction state lives in
//! [`state::ChatBarState`].

mod effects;
mod focus;
mod frame;
mod height;
mod input;
mod state;
mod theme;
mod writer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chatbar::client::CompletionClient;
use chatbar::config::AppConfig;
use chatbar::doctor::{base_doctor_report, DoctorReport};
use chatbar::hotkey::ChordDetector;
use chatbar::markdown::{self, MarkdownStyle};
use chatbar::sched::DeferredQueue;
use chatbar::terminal_restore::TerminalRestoreGuard;
use chatbar::{init_logging, init_tracing, log_debug, log_debug_content};
use chatbar::{RequestWorker, WorkerEvent};
use crossbeam_channel::{select, unbounded, Sender};

use crate::focus::{FocusDriver, TerminalFocus, FOCUS_RETRY_DELAYS_MS};
use crate::frame::{compose, FrameInput, PanelFrame};
use crate::height::{collapsed_panel_rows, target_panel_rows, HeightDriver};
use crate::input::{spawn_input_thread, InputEvent};
use crate::state::{Affordance, ChatBarState, VisualState};
use crate::theme::{resolve_colors, ThemeColors};
use crate::writer::{spawn_writer_thread, WriterMsg};

/// Idle tick when nothing is scheduled; keeps animations advancing.
const EVENT_LOOP_IDLE_MS: u64 = 50;
/// Height re-measure delay after a stream fragment lands.
const HEIGHT_RECOMPUTE_DELAY: Duration = Duration::from_millis(10);
/// Height re-measure delay after the stream settles (the markdown pass can
/// change the wrapped line count).
const SETTLE_RECOMPUTE_DELAY: Duration = Duration::from_millis(50);
static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);

extern "C" fn flag_resize(_signal: libc::c_int) {
    RESIZE_PENDING.store(true, Ordering::SeqCst);
}

fn install_resize_handler() {
    unsafe {
        libc::signal(libc::SIGWINCH, flag_resize as libc::sighandler_t);
    }
}

/// Deferred work drained by the idle tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UiAction {
    RecomputeHeight,
    FocusAttempt,
}

struct App<F: FocusDriver> {
    config: AppConfig,
    colors: ThemeColors,
    state: ChatBarState,
    detector: ChordDetector,
    driver: HeightDriver,
    deferred: DeferredQueue<UiAction>,
    worker: RequestWorker,
    writer_tx: Sender<WriterMsg>,
    focus: F,
    term_cols: u16,
    /// When the current affordance started; effect phases run off this.
    effect_anchor: Instant,
    last_affordance: Affordance,
}

impl<F: FocusDriver> App<F> {
    fn new(
        config: AppConfig,
        worker: RequestWorker,
        writer_tx: Sender<WriterMsg>,
        focus: F,
        term_cols: u16,
    ) -> Self {
        let colors = resolve_colors(&config);
        Self {
            config,
            colors,
            state: ChatBarState::new(),
            detector: ChordDetector::new(),
            driver: HeightDriver::new(collapsed_panel_rows()),
            deferred: DeferredQueue::new(),
            worker,
            writer_tx,
            focus,
            term_cols,
            effect_anchor: Instant::now(),
            last_affordance: Affordance::None,
        }
    }

    fn panel_width(&self) -> usize {
        let cols = self.term_cols as usize;
        if self.config.width == 0 {
            cols
        } else {
            (self.config.width as usize).min(cols)
        }
    }

    /// Columns available to wrapped response text inside the borders.
    fn content_width(&self) -> usize {
        self.panel_width().saturating_sub(4)
    }

    fn current_target(&self) -> usize {
        if self.state.response_area_visible() {
            target_panel_rows(
                self.state.display_text(),
                self.content_width(),
                self.state.copy_available(),
                self.config.max_response_rows,
            )
        } else {
            collapsed_panel_rows()
        }
    }

    /// Prime the composer and writer so the first toggle paints without a
    /// perceptible delay.
    fn warm_up(&mut self) {
        let frame = self.compose_frame(Instant::now());
        let _ = self.writer_tx.send(WriterMsg::ShowPanel(frame));
        let _ = self.writer_tx.send(WriterMsg::ClearPanel);
    }

    fn next_timeout(&self, now: Instant) -> Duration {
        let idle = Duration::from_millis(EVENT_LOOP_IDLE_MS);
        match self.deferred.next_deadline() {
            Some(deadline) => deadline.saturating_duration_since(now).min(idle),
            None => idle,
        }
    }

    fn compose_frame(&mut self, now: Instant) -> PanelFrame {
        let rows = self.driver.tick(now);
        compose(&FrameInput {
            colors: &self.colors,
            width: self.panel_width(),
            rows,
            input: self.state.input(),
            input_enabled: self.state.input_enabled(),
            display_text: self.state.display_text(),
            response_visible: self.state.response_area_visible(),
            copy_visible: self.state.copy_available(),
            thinking: self.state.visual() == VisualState::Thinking,
            errored: self.state.errored(),
            affordance: self.state.affordance(),
            effect_elapsed: now.saturating_duration_since(self.effect_anchor),
        })
    }

    fn repaint(&mut self, now: Instant) {
        if !self.state.visible() {
            let _ = self.writer_tx.send(WriterMsg::ClearPanel);
            return;
        }
        let affordance = self.state.affordance();
        if affordance != self.last_affordance {
            self.effect_anchor = now;
            self.last_affordance = affordance;
        }
        let frame = self.compose_frame(now);
        let _ = self.writer_tx.send(WriterMsg::ShowPanel(frame));
    }

    fn toggle(&mut self, now: Instant) {
        if self.state.toggle() {
            tracing::info!(target: "chatbar::ui", "bar shown");
            self.driver.snap(self.current_target());
            self.repaint(now);
            for delay_ms in FOCUS_RETRY_DELAYS_MS {
                self.deferred
                    .schedule(now + Duration::from_millis(delay_ms), UiAction::FocusAttempt);
            }
        } else {
            tracing::info!(target: "chatbar::ui", "bar hidden");
            self.deferred.clear();
            self.driver.snap(collapsed_panel_rows());
            let _ = self.writer_tx.send(WriterMsg::ClearPanel);
        }
    }

    fn submit(&mut self, now: Instant) {
        let Some(prompt) = self.state.submit() else {
            return;
        };
        tracing::info!(target: "chatbar::ui", chars = prompt.len(), "prompt submitted");
        log_debug_content(&format!("prompt: {prompt}"));
        if let Err(err) = self.worker.submit(&prompt) {
            log_debug(&format!("dispatch failed: {err}"));
            self.state.on_errored("Error: could not dispatch the request.");
        }
        self.deferred
            .schedule(now + HEIGHT_RECOMPUTE_DELAY, UiAction::RecomputeHeight);
        self.repaint(now);
    }

    fn copy_response(&mut self) {
        if !self.state.copy_available() {
            return;
        }
        let text = self.state.response().to_string();
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => {
                log_debug("response copied to clipboard");
                tracing::info!(target: "chatbar::ui", "response copied");
            }
            Err(err) => log_debug(&format!("clipboard copy failed: {err}")),
        }
    }

    /// Returns false when the app should exit.
    fn handle_input(&mut self, event: InputEvent, now: Instant) -> bool {
        match event {
            InputEvent::Chord => {
                if self.detector.on_chord(now) {
                    self.toggle(now);
                }
            }
            InputEvent::Text(text) => {
                if self.state.visible() && self.state.input_enabled() {
                    self.state.push_input_str(&text);
                    self.repaint(now);
                }
            }
            InputEvent::Backspace => {
                if self.state.visible() && self.state.input_enabled() {
                    self.state.backspace();
                    self.repaint(now);
                }
            }
            InputEvent::Submit => self.submit(now),
            InputEvent::Copy => self.copy_response(),
            InputEvent::Hide => {
                if self.state.visible() {
                    self.toggle(now);
                }
            }
            InputEvent::Exit => {
                log_debug("exit requested");
                return false;
            }
        }
        true
    }

    fn handle_worker(&mut self, event: WorkerEvent, now: Instant) {
        match event {
            WorkerEvent::Chunk(text) => {
                self.state.on_chunk(&text);
                self.deferred
                    .schedule(now + HEIGHT_RECOMPUTE_DELAY, UiAction::RecomputeHeight);
            }
            WorkerEvent::Finished => {
                self.worker.resolve();
                self.state.on_finished();
                let style = if self.config.no_color {
                    MarkdownStyle::plain()
                } else {
                    MarkdownStyle::ansi()
                };
                let rendered = markdown::render(self.state.response(), style);
                self.state.set_rendered(rendered);
                log_debug_content(&format!(
                    "response settled ({} chars)",
                    self.state.response().len()
                ));
                self.deferred
                    .schedule(now + SETTLE_RECOMPUTE_DELAY, UiAction::RecomputeHeight);
                // Input is re-enabled on settle; hand the caret back to it.
                self.deferred.schedule(now, UiAction::FocusAttempt);
            }
            WorkerEvent::Errored(message) => {
                self.worker.resolve();
                log_debug(&format!("stream errored: {message}"));
                self.state.on_errored(&message);
                self.deferred
                    .schedule(now + SETTLE_RECOMPUTE_DELAY, UiAction::RecomputeHeight);
                self.deferred.schedule(now, UiAction::FocusAttempt);
            }
        }
        if self.state.visible() {
            self.repaint(now);
        }
    }

    fn handle_resize(&mut self, now: Instant) {
        if let Ok((cols, rows)) = crossterm::terminal::size() {
            log_debug(&format!("terminal resized to {cols}x{rows}"));
            self.term_cols = cols;
            let _ = self.writer_tx.send(WriterMsg::Resize { cols, rows });
            self.driver.snap(self.current_target());
            if self.state.visible() {
                self.repaint(now);
            }
        }
    }

    fn tick(&mut self, now: Instant) {
        if RESIZE_PENDING.swap(false, Ordering::SeqCst) {
            self.handle_resize(now);
        }
        let mut repaint = false;
        for action in self.deferred.due(now) {
            match action {
                UiAction::RecomputeHeight => {
                    self.driver.request(self.current_target(), now);
                    repaint = true;
                }
                UiAction::FocusAttempt => {
                    if self.state.visible() {
                        self.focus.bring_to_front();
                        self.focus.acquire_focus();
                    }
                }
            }
        }
        let animated = self.driver.animating()
            || self.state.visual() == VisualState::Thinking
            || self.state.affordance() != Affordance::None;
        if self.state.visible() && (repaint || animated) {
            self.repaint(now);
        }
    }
}

fn doctor_report(config: &AppConfig) -> DoctorReport {
    let mut report = base_doctor_report(config, "chatbar");
    report.section("Terminal");
    match crossterm::terminal::size() {
        Ok((cols, rows)) => report.push_kv("size", format!("{cols}x{rows}")),
        Err(err) => report.push_kv("size", format!("unavailable ({err})")),
    }
    report
}

fn run(config: AppConfig) -> Result<()> {
    let client = CompletionClient::new(&config)?;
    let (cols, rows) = crossterm::terminal::size().context("failed to query terminal size")?;

    let guard = TerminalRestoreGuard::new();
    guard.enable_raw_mode().context("failed to enable raw mode")?;
    install_resize_handler();

    let (writer_tx, writer_rx) = unbounded();
    let writer_handle = spawn_writer_thread(writer_rx, cols, rows);
    let (input_tx, input_rx) = unbounded();
    // The input thread blocks on stdin and is abandoned at exit.
    let _input_handle = spawn_input_thread(input_tx);
    let (event_tx, event_rx) = unbounded();
    let worker = RequestWorker::spawn(client, event_tx);

    let focus = TerminalFocus::new(writer_tx.clone());
    let mut app = App::new(config, worker, writer_tx.clone(), focus, cols);
    app.warm_up();
    log_debug("chatbar ready; Ctrl+Space toggles the bar");

    loop {
        let timeout = app.next_timeout(Instant::now());
        select! {
            recv(input_rx) -> msg => match msg {
                Ok(event) => {
                    if !app.handle_input(event, Instant::now()) {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(event_rx) -> msg => match msg {
                Ok(event) => app.handle_worker(event, Instant::now()),
                Err(_) => break,
            },
            default(timeout) => app.tick(Instant::now()),
        }
    }

    let _ = writer_tx.send(WriterMsg::Shutdown);
    let _ = writer_handle.join();
    guard.restore();
    Ok(())
}

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    if config.doctor {
        println!("{}", doctor_report(&config).render());
        return Ok(());
    }
    init_logging(&config);
    init_tracing(&config);
    run(config)
}
