//! Command-line parsing and validation helpers.

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;

/// Default base URL of the local OpenAI-compatible completion server.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:1234/v1";
/// Default model requested from the completion server.
pub const DEFAULT_MODEL: &str = "llama-3.2-1b-instruct";
/// Default system prompt sent with every request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
/// Default panel width in columns (0 = full terminal width).
pub const DEFAULT_PANEL_WIDTH: u16 = 80;
/// Default cap on the response area height in rows.
pub const DEFAULT_MAX_RESPONSE_ROWS: usize = 12;

/// CLI options for the chat bar. Validated values keep the overlay and the
/// request worker within sane bounds.
#[derive(Debug, Parser, Clone)]
#[command(about = "ChatBar - hotkey-toggled chat overlay for a local AI server", author, version)]
pub struct AppConfig {
    /// Base URL of the OpenAI-compatible completion server
    #[arg(long = "server-url", env = "CHATBAR_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Model name requested from the server
    #[arg(long, env = "CHATBAR_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// System prompt prepended to every request
    #[arg(long = "system-prompt", default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system_prompt: String,

    /// Sampling temperature passed to the server
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Per-request timeout in seconds (covers the whole stream)
    #[arg(long = "request-timeout-secs", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Panel width in columns (0 = use the full terminal width)
    #[arg(long, default_value_t = DEFAULT_PANEL_WIDTH)]
    pub width: u16,

    /// Maximum response area height in rows before the content is clipped
    #[arg(long = "max-response-rows", default_value_t = DEFAULT_MAX_RESPONSE_ROWS)]
    pub max_response_rows: usize,

    /// Color theme for the panel (coral, catppuccin, dracula, nord, ansi, none)
    #[arg(long = "theme", default_value = "coral")]
    pub theme_name: String,

    /// Optional JSON theme-override file (cosmetic; missing file falls back silently)
    #[arg(long = "theme-file", env = "CHATBAR_THEME_FILE")]
    pub theme_file: Option<PathBuf>,

    /// Disable colors in panel output
    #[arg(long = "no-color", default_value_t = false)]
    pub no_color: bool,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "CHATBAR_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "CHATBAR_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Allow logging prompt/response snippets (debug log only)
    #[arg(long = "log-content", env = "CHATBAR_LOG_CONTENT", default_value_t = false)]
    pub log_content: bool,

    /// Print environment diagnostics and exit
    #[arg(long = "doctor", default_value_t = false)]
    pub doctor: bool,
}

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before any thread or terminal state is touched.
    pub fn validate(&self) -> Result<()> {
        const MIN_PANEL_WIDTH: u16 = 40;
        const MAX_PANEL_WIDTH: u16 = 400;
        const MIN_RESPONSE_ROW_CAP: usize = 4;
        const MAX_RESPONSE_ROW_CAP: usize = 100;

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            bail!(
                "--server-url must start with http:// or https://, got {}",
                self.server_url
            );
        }
        if self.model.trim().is_empty() {
            bail!("--model must not be empty");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!(
                "--temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            );
        }
        if !(1..=600).contains(&self.request_timeout_secs) {
            bail!(
                "--request-timeout-secs must be between 1 and 600, got {}",
                self.request_timeout_secs
            );
        }
        if self.width != 0 && !(MIN_PANEL_WIDTH..=MAX_PANEL_WIDTH).contains(&self.width) {
            bail!(
                "--width must be 0 (full width) or between {MIN_PANEL_WIDTH} and {MAX_PANEL_WIDTH}, got {}",
                self.width
            );
        }
        if !(MIN_RESPONSE_ROW_CAP..=MAX_RESPONSE_ROW_CAP).contains(&self.max_response_rows) {
            bail!(
                "--max-response-rows must be between {MIN_RESPONSE_ROW_CAP} and {MAX_RESPONSE_ROW_CAP}, got {}",
                self.max_response_rows
            );
        }
        Ok(())
    }

    /// Base URL with any trailing slash removed, ready for path joins.
    pub fn normalized_server_url(&self) -> String {
        self.server_url.trim_end_matches('/').to_string()
    }
}
