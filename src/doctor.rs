//! Plain-text diagnostics report for `--doctor`.

use crate::config::AppConfig;
use crate::logging::log_file_path;

/// Accumulates key/value diagnostics, rendered as an aligned plain-text block.
pub struct DoctorReport {
    lines: Vec<String>,
}

impl DoctorReport {
    pub fn new(title: &str) -> Self {
        Self {
            lines: vec![format!("{title} doctor"), "=".repeat(title.len() + 7)],
        }
    }

    pub fn section(&mut self, name: &str) {
        self.lines.push(String::new());
        self.lines.push(format!("[{name}]"));
    }

    pub fn push_kv(&mut self, key: &str, value: impl std::fmt::Display) {
        self.lines.push(format!("  {key:<24} {value}"));
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

/// Build the base report shared by every binary: versions, config, log paths.
pub fn base_doctor_report(config: &AppConfig, app_name: &str) -> DoctorReport {
    let mut report = DoctorReport::new(app_name);
    report.section("Build");
    report.push_kv("version", env!("CARGO_PKG_VERSION"));
    report.section("Server");
    report.push_kv("server_url", &config.server_url);
    report.push_kv("model", &config.model);
    report.push_kv("temperature", config.temperature);
    report.push_kv("request_timeout_secs", config.request_timeout_secs);
    report.section("Panel");
    report.push_kv(
        "width",
        if config.width == 0 {
            "full".to_string()
        } else {
            config.width.to_string()
        },
    );
    report.push_kv("max_response_rows", config.max_response_rows);
    report.push_kv("theme", &config.theme_name);
    report.push_kv(
        "theme_file",
        config
            .theme_file
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "none".to_string()),
    );
    report.push_kv("no_color", config.no_color);
    report.section("Logging");
    report.push_kv("logs", config.logs);
    report.push_kv("log_file", log_file_path().display());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn report_contains_config_values() {
        let config = AppConfig::parse_from(["chatbar", "--model", "test-model"]);
        let report = base_doctor_report(&config, "chatbar");
        let rendered = report.render();
        assert!(rendered.contains("chatbar doctor"));
        assert!(rendered.contains("server_url"));
        assert!(rendered.contains("test-model"));
    }

    #[test]
    fn sections_are_bracketed() {
        let mut report = DoctorReport::new("x");
        report.section("Extra");
        report.push_kv("k", "v");
        let rendered = report.render();
        assert!(rendered.contains("[Extra]"));
        assert!(rendered.contains("k"));
    }
}
