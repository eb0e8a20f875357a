//! Background worker that owns the single in-flight completion request.
//!
//! The worker runs on its own thread so blocking network I/O never stalls the
//! UI loop. Only [`WorkerEvent`]s cross back over the channel boundary; the
//! worker never touches UI state directly.

use crate::client::CompletionSource;
use crate::log_debug;
use anyhow::{bail, Result};
use crossbeam_channel::{bounded, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

/// Max prompts queued for the worker thread. Single-flight discipline means
/// this never holds more than one entry in practice.
const PROMPT_CHANNEL_CAPACITY: usize = 4;

/// Event emitted by the worker describing stream progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// One text fragment arrived.
    Chunk(String),
    /// The stream ended normally (error fragments included - those are data).
    Finished,
    /// The stream machinery itself fell over mid-iteration.
    Errored(String),
}

/// Handle identifying one in-flight request.
///
/// At most one session is alive at a time: [`RequestWorker::submit`] refuses
/// to create a second one until the current session has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSession {
    id: u64,
}

impl StreamSession {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Owns the worker thread and enforces single-flight submission.
pub struct RequestWorker {
    prompt_tx: Sender<String>,
    session: Option<StreamSession>,
    next_id: u64,
    #[allow(dead_code)]
    handle: Option<JoinHandle<()>>,
}

impl RequestWorker {
    /// Spawn the worker thread. It lives for the rest of the process; no
    /// graceful drain is attempted at exit since at most one request is ever
    /// outstanding and process exit abandons it.
    pub fn spawn<S>(source: S, events: Sender<WorkerEvent>) -> Self
    where
        S: CompletionSource + 'static,
    {
        let (prompt_tx, prompt_rx) = bounded::<String>(PROMPT_CHANNEL_CAPACITY);
        let handle = thread::spawn(move || {
            for prompt in prompt_rx.iter() {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    let mut fragments = 0usize;
                    for fragment in source.stream(&prompt) {
                        fragments += 1;
                        if events.send(WorkerEvent::Chunk(fragment)).is_err() {
                            return 0;
                        }
                    }
                    fragments
                }));
                match outcome {
                    Ok(fragments) => {
                        tracing::info!(target: "chatbar::worker", fragments, "stream finished");
                        if events.send(WorkerEvent::Finished).is_err() {
                            return;
                        }
                    }
                    Err(payload) => {
                        let detail = panic_message(payload.as_ref());
                        log_debug(&format!("stream iteration panicked: {detail}"));
                        tracing::error!(target: "chatbar::worker", error = %detail, "stream errored");
                        let message =
                            "An unexpected error occurred while reading the response stream."
                                .to_string();
                        if events.send(WorkerEvent::Errored(message)).is_err() {
                            return;
                        }
                    }
                }
            }
        });
        Self {
            prompt_tx,
            session: None,
            next_id: 0,
            handle: Some(handle),
        }
    }

    /// Dispatch a prompt, creating the session handle for it.
    ///
    /// Refuses while a prior session is unresolved - the UI disables its
    /// input for the duration, so hitting this path means the single-flight
    /// discipline was bypassed.
    pub fn submit(&mut self, prompt: &str) -> Result<StreamSession> {
        if let Some(session) = self.session {
            bail!("a completion request is already in flight (session {})", session.id());
        }
        if prompt.is_empty() {
            bail!("refusing to dispatch an empty prompt");
        }
        self.prompt_tx
            .send(prompt.to_string())
            .map_err(|_| anyhow::anyhow!("request worker is gone"))?;
        self.next_id += 1;
        let session = StreamSession { id: self.next_id };
        self.session = Some(session);
        Ok(session)
    }

    /// Clear the active session after a terminal `Finished`/`Errored` event.
    pub fn resolve(&mut self) -> Option<StreamSession> {
        self.session.take()
    }

    /// Whether a request is currently unresolved.
    pub fn in_flight(&self) -> bool {
        self.session.is_some()
    }

    #[cfg(test)]
    fn join_for_tests(self) {
        // Dropping the sender closes the prompt channel and ends the thread.
        let Self {
            prompt_tx, handle, ..
        } = self;
        drop(prompt_tx);
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    /// Scripted source: replays a fixed fragment list per prompt.
    struct ScriptedSource {
        fragments: Vec<String>,
    }

    impl CompletionSource for ScriptedSource {
        fn stream(&self, _prompt: &str) -> Box<dyn Iterator<Item = String> + Send + '_> {
            Box::new(self.fragments.clone().into_iter())
        }
    }

    /// Source whose iterator panics after one fragment.
    struct PanickingSource;

    impl CompletionSource for PanickingSource {
        fn stream(&self, _prompt: &str) -> Box<dyn Iterator<Item = String> + Send + '_> {
            Box::new(
                std::iter::once("partial".to_string())
                    .chain(std::iter::once_with(|| panic!("boom"))),
            )
        }
    }

    fn collect_until_terminal(
        rx: &crossbeam_channel::Receiver<WorkerEvent>,
    ) -> Vec<WorkerEvent> {
        let mut events = Vec::new();
        loop {
            let event = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("worker event");
            let terminal = matches!(event, WorkerEvent::Finished | WorkerEvent::Errored(_));
            events.push(event);
            if terminal {
                return events;
            }
        }
    }

    #[test]
    fn fragments_arrive_in_order_then_finished() {
        let (tx, rx) = unbounded();
        let source = ScriptedSource {
            fragments: vec!["Hi".into(), " there".into(), "!".into()],
        };
        let mut worker = RequestWorker::spawn(source, tx);
        worker.submit("hello").expect("submit");
        let events = collect_until_terminal(&rx);
        assert_eq!(
            events,
            vec![
                WorkerEvent::Chunk("Hi".into()),
                WorkerEvent::Chunk(" there".into()),
                WorkerEvent::Chunk("!".into()),
                WorkerEvent::Finished,
            ]
        );
        worker.resolve();
        assert!(!worker.in_flight());
        worker.join_for_tests();
    }

    #[test]
    fn submit_refuses_while_session_unresolved() {
        let (tx, rx) = unbounded();
        let source = ScriptedSource { fragments: vec![] };
        let mut worker = RequestWorker::spawn(source, tx);
        let session = worker.submit("one").expect("first submit");
        assert!(worker.in_flight());
        let err = worker.submit("two").expect_err("second submit must refuse");
        assert!(err.to_string().contains("already in flight"));
        let _ = collect_until_terminal(&rx);
        assert_eq!(worker.resolve(), Some(session));
        // After resolution a new submission is accepted again.
        worker.submit("three").expect("post-resolve submit");
        let _ = collect_until_terminal(&rx);
        worker.resolve();
        worker.join_for_tests();
    }

    #[test]
    fn submit_refuses_empty_prompt() {
        let (tx, _rx) = unbounded();
        let source = ScriptedSource { fragments: vec![] };
        let mut worker = RequestWorker::spawn(source, tx);
        assert!(worker.submit("").is_err());
        assert!(!worker.in_flight());
        worker.join_for_tests();
    }

    #[test]
    fn iteration_panic_surfaces_as_errored() {
        let (tx, rx) = unbounded();
        let mut worker = RequestWorker::spawn(PanickingSource, tx);
        worker.submit("x").expect("submit");
        let events = collect_until_terminal(&rx);
        assert_eq!(events[0], WorkerEvent::Chunk("partial".into()));
        assert!(matches!(events.last(), Some(WorkerEvent::Errored(_))));
        worker.resolve();
        worker.join_for_tests();
    }

    #[test]
    fn session_ids_are_distinct() {
        let (tx, rx) = unbounded();
        let source = ScriptedSource { fragments: vec![] };
        let mut worker = RequestWorker::spawn(source, tx);
        let first = worker.submit("a").expect("submit a");
        let _ = collect_until_terminal(&rx);
        worker.resolve();
        let second = worker.submit("b").expect("submit b");
        assert_ne!(first.id(), second.id());
        let _ = collect_until_terminal(&rx);
        worker.resolve();
        worker.join_for_tests();
    }
}
