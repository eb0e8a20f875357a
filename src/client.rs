//! Streaming client for a local OpenAI-compatible completion server.
//!
//! One request maps to one [`FragmentStream`]: a lazy, finite, single-consumer
//! iterator of text fragments. Failures are surfaced as data - the stream
//! yields exactly one human-readable `Error: ...` fragment and then ends, so
//! downstream consumers only ever deal with one fragment type.

use crate::config::AppConfig;
use crate::log_debug;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// A source of completion fragments. The seam between the request worker and
/// the network; tests substitute a scripted implementation.
pub trait CompletionSource: Send {
    fn stream(&self, prompt: &str) -> Box<dyn Iterator<Item = String> + Send + '_>;
}

/// Blocking HTTP client for the chat-completions endpoint.
pub struct CompletionClient {
    http: reqwest::blocking::Client,
    base_url: String,
    model: String,
    system_prompt: String,
    temperature: f32,
}

impl CompletionClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.normalized_server_url(),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
        })
    }

    /// Start a streaming completion for `prompt`.
    ///
    /// Lazy in the sense that fragments are pulled off the socket as the
    /// iterator is consumed; the HTTP request itself is issued here so a
    /// connect failure is already folded into the returned stream.
    pub fn stream(&self, prompt: &str) -> FragmentStream {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            stream: true,
        };
        let url = format!("{}/chat/completions", self.base_url);
        tracing::info!(target: "chatbar::client", model = %self.model, "request started");
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .and_then(|response| response.error_for_status());
        match response {
            Ok(response) => FragmentStream::from_response(response),
            Err(err) => {
                log_debug(&format!("completion request failed: {err}"));
                tracing::warn!(target: "chatbar::client", error = %err, "request failed");
                FragmentStream::failed(connect_error_fragment(&self.base_url))
            }
        }
    }
}

impl CompletionSource for CompletionClient {
    fn stream(&self, prompt: &str) -> Box<dyn Iterator<Item = String> + Send + '_> {
        Box::new(CompletionClient::stream(self, prompt))
    }
}

/// One in-flight response stream. Finite, non-restartable, single consumer.
pub struct FragmentStream {
    reader: Option<BufReader<reqwest::blocking::Response>>,
    pending_error: Option<String>,
    done: bool,
}

impl FragmentStream {
    fn from_response(response: reqwest::blocking::Response) -> Self {
        Self {
            reader: Some(BufReader::new(response)),
            pending_error: None,
            done: false,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            reader: None,
            pending_error: Some(message),
            done: false,
        }
    }
}

impl Iterator for FragmentStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        if let Some(message) = self.pending_error.take() {
            self.done = true;
            return Some(message);
        }
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => {
                self.done = true;
                return None;
            }
        };
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => match parse_sse_line(line.trim_end()) {
                    SseLine::Done => {
                        self.done = true;
                        return None;
                    }
                    SseLine::Data(payload) => {
                        if let Some(text) = delta_text(&payload) {
                            if !text.is_empty() {
                                return Some(text);
                            }
                        }
                    }
                    SseLine::Ignore => {}
                },
                Err(err) => {
                    log_debug(&format!("stream read failed: {err}"));
                    self.done = true;
                    return Some(read_error_fragment(&err));
                }
            }
        }
    }
}

/// One decoded server-sent-events line.
#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    /// A `data:` line carrying a JSON payload
    Data(String),
    /// The `data: [DONE]` terminator
    Done,
    /// Blank lines, comments, `event:` fields - anything we skip
    Ignore,
}

fn parse_sse_line(line: &str) -> SseLine {
    let Some(rest) = line.strip_prefix("data:") else {
        return SseLine::Ignore;
    };
    let payload = rest.trim();
    if payload == "[DONE]" {
        SseLine::Done
    } else if payload.is_empty() {
        SseLine::Ignore
    } else {
        SseLine::Data(payload.to_string())
    }
}

/// Pull `choices[0].delta.content` out of a chunk payload.
///
/// Unknown or malformed payloads are skipped rather than treated as fatal;
/// the server interleaves role/finish chunks that carry no text.
fn delta_text(payload: &str) -> Option<String> {
    let chunk: StreamChunk = serde_json::from_str(payload).ok()?;
    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
}

fn connect_error_fragment(base_url: &str) -> String {
    format!("Error: could not connect to the completion server at {base_url}. Please ensure it is running.")
}

fn read_error_fragment(err: &std::io::Error) -> String {
    format!("Error: the response stream ended unexpectedly: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_data_line_is_extracted() {
        assert_eq!(
            parse_sse_line("data: {\"x\":1}"),
            SseLine::Data("{\"x\":1}".to_string())
        );
    }

    #[test]
    fn sse_done_marker_terminates() {
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
    }

    #[test]
    fn sse_noise_is_ignored() {
        assert_eq!(parse_sse_line(""), SseLine::Ignore);
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Ignore);
        assert_eq!(parse_sse_line("event: ping"), SseLine::Ignore);
        assert_eq!(parse_sse_line("data:"), SseLine::Ignore);
    }

    #[test]
    fn delta_text_reads_first_choice() {
        let payload = r#"{"choices":[{"delta":{"content":"Hi"}}]}"#;
        assert_eq!(delta_text(payload), Some("Hi".to_string()));
    }

    #[test]
    fn delta_text_skips_contentless_chunks() {
        assert_eq!(delta_text(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#), None);
        assert_eq!(delta_text(r#"{"choices":[]}"#), None);
        assert_eq!(delta_text("not json"), None);
    }

    #[test]
    fn failed_stream_yields_single_error_fragment() {
        let mut stream = FragmentStream::failed(connect_error_fragment("http://localhost:1234/v1"));
        let first = stream.next().expect("error fragment");
        assert!(first.starts_with("Error:"));
        assert!(first.contains("http://localhost:1234/v1"));
        assert_eq!(stream.next(), None);
        assert_eq!(stream.next(), None);
    }
}
