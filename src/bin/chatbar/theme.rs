//! Color themes for the chat bar panel.
//!
//! Themes are purely cosmetic: a missing or malformed override file falls
//! back to the built-in palette without surfacing anything to the user.

use chatbar::config::AppConfig;
use chatbar::log_debug;
use serde::Deserialize;
use std::fs;

/// Border character set for drawing the panel box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderSet {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
    pub t_left: char,
    pub t_right: char,
}

/// Standard single-line borders
pub const BORDER_SINGLE: BorderSet = BorderSet {
    top_left: '┌',
    top_right: '┐',
    bottom_left: '└',
    bottom_right: '┘',
    horizontal: '─',
    vertical: '│',
    t_left: '├',
    t_right: '┤',
};

/// Rounded corners (default)
pub const BORDER_ROUNDED: BorderSet = BorderSet {
    top_left: '╭',
    top_right: '╮',
    bottom_left: '╰',
    bottom_right: '╯',
    horizontal: '─',
    vertical: '│',
    t_left: '├',
    t_right: '┤',
};

/// Double-line borders
pub const BORDER_DOUBLE: BorderSet = BorderSet {
    top_left: '╔',
    top_right: '╗',
    bottom_left: '╚',
    bottom_right: '╝',
    horizontal: '═',
    vertical: '║',
    t_left: '╠',
    t_right: '╣',
};

/// Heavy/bold borders
pub const BORDER_HEAVY: BorderSet = BorderSet {
    top_left: '┏',
    top_right: '┓',
    bottom_left: '┗',
    bottom_right: '┛',
    horizontal: '━',
    vertical: '┃',
    t_left: '┣',
    t_right: '┫',
};

/// ANSI color codes for a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    /// Accent for the input prompt and copy button
    pub accent: &'static str,
    /// Primary response text
    pub text: &'static str,
    /// Placeholder/secondary text
    pub dim: &'static str,
    /// Error fragments
    pub error: &'static str,
    /// Edge-glow border highlight (typing affordance)
    pub glow: &'static str,
    /// Shimmer border highlight (thinking affordance)
    pub shimmer: &'static str,
    /// Plain border color
    pub border: &'static str,
    /// Reset code
    pub reset: &'static str,
    /// Border character set
    pub borders: BorderSet,
}

/// Available color themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    /// Default coral/red theme
    #[default]
    Coral,
    /// Catppuccin Mocha - pastel dark theme
    Catppuccin,
    /// Dracula - high contrast dark theme
    Dracula,
    /// Nord - arctic blue-gray theme
    Nord,
    /// ANSI 16-color fallback for older terminals
    Ansi,
    /// No colors - plain text
    None,
}

impl Theme {
    /// Parse theme name from string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "coral" | "default" => Some(Self::Coral),
            "catppuccin" | "mocha" => Some(Self::Catppuccin),
            "dracula" => Some(Self::Dracula),
            "nord" => Some(Self::Nord),
            "ansi" | "ansi16" | "basic" => Some(Self::Ansi),
            "none" | "plain" => Some(Self::None),
            _ => None,
        }
    }

    /// Get the color palette for this theme.
    pub fn colors(&self) -> ThemeColors {
        match self {
            Self::Coral => THEME_CORAL,
            Self::Catppuccin => THEME_CATPPUCCIN,
            Self::Dracula => THEME_DRACULA,
            Self::Nord => THEME_NORD,
            Self::Ansi => THEME_ANSI,
            Self::None => THEME_NONE,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coral => write!(f, "coral"),
            Self::Catppuccin => write!(f, "catppuccin"),
            Self::Dracula => write!(f, "dracula"),
            Self::Nord => write!(f, "nord"),
            Self::Ansi => write!(f, "ansi"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Coral theme - warm red/coral accents (default)
pub const THEME_CORAL: ThemeColors = ThemeColors {
    accent: "\x1b[38;2;255;127;102m",
    text: "\x1b[38;2;230;225;220m",
    dim: "\x1b[38;2;140;135;130m",
    error: "\x1b[91m",
    glow: "\x1b[38;2;255;180;160m",
    shimmer: "\x1b[38;2;255;240;230m",
    border: "\x1b[38;2;110;90;85m",
    reset: "\x1b[0m",
    borders: BORDER_ROUNDED,
};

/// Catppuccin Mocha - lavender and mauve pastels
pub const THEME_CATPPUCCIN: ThemeColors = ThemeColors {
    accent: "\x1b[38;2;203;166;247m",
    text: "\x1b[38;2;205;214;244m",
    dim: "\x1b[38;2;127;132;156m",
    error: "\x1b[38;2;243;139;168m",
    glow: "\x1b[38;2;180;190;254m",
    shimmer: "\x1b[38;2;245;224;220m",
    border: "\x1b[38;2;88;91;112m",
    reset: "\x1b[0m",
    borders: BORDER_ROUNDED,
};

/// Dracula - purple and pink on dark
pub const THEME_DRACULA: ThemeColors = ThemeColors {
    accent: "\x1b[38;2;189;147;249m",
    text: "\x1b[38;2;248;248;242m",
    dim: "\x1b[38;2;98;114;164m",
    error: "\x1b[38;2;255;85;85m",
    glow: "\x1b[38;2;255;121;198m",
    shimmer: "\x1b[38;2;241;250;140m",
    border: "\x1b[38;2;68;71;90m",
    reset: "\x1b[0m",
    borders: BORDER_SINGLE,
};

/// Nord - arctic blue-gray
pub const THEME_NORD: ThemeColors = ThemeColors {
    accent: "\x1b[38;2;136;192;208m",
    text: "\x1b[38;2;216;222;233m",
    dim: "\x1b[38;2;97;110;136m",
    error: "\x1b[38;2;191;97;106m",
    glow: "\x1b[38;2;129;161;193m",
    shimmer: "\x1b[38;2;236;239;244m",
    border: "\x1b[38;2;76;86;106m",
    reset: "\x1b[0m",
    borders: BORDER_SINGLE,
};

/// ANSI 16-color fallback
pub const THEME_ANSI: ThemeColors = ThemeColors {
    accent: "\x1b[96m",
    text: "\x1b[97m",
    dim: "\x1b[90m",
    error: "\x1b[91m",
    glow: "\x1b[95m",
    shimmer: "\x1b[93m",
    border: "\x1b[37m",
    reset: "\x1b[0m",
    borders: BORDER_SINGLE,
};

/// No colors - plain text with plain borders
pub const THEME_NONE: ThemeColors = ThemeColors {
    accent: "",
    text: "",
    dim: "",
    error: "",
    glow: "",
    shimmer: "",
    border: "",
    reset: "",
    borders: BORDER_SINGLE,
};

/// Optional cosmetic overrides loaded from `--theme-file`.
#[derive(Debug, Deserialize, Default)]
struct ThemeOverride {
    theme: Option<String>,
    border: Option<String>,
}

fn border_from_name(name: &str) -> Option<BorderSet> {
    match name.to_lowercase().as_str() {
        "single" => Some(BORDER_SINGLE),
        "rounded" => Some(BORDER_ROUNDED),
        "double" => Some(BORDER_DOUBLE),
        "heavy" => Some(BORDER_HEAVY),
        _ => None,
    }
}

/// Resolve the effective palette from CLI flags and the optional theme file.
///
/// Any failure here is cosmetic: log it and keep the built-in presentation.
pub fn resolve_colors(config: &AppConfig) -> ThemeColors {
    let mut theme = if config.no_color {
        Theme::None
    } else {
        Theme::from_name(&config.theme_name).unwrap_or_else(|| {
            log_debug(&format!("unknown theme {:?}, using coral", config.theme_name));
            Theme::Coral
        })
    };
    let mut border_override = None;

    if let Some(path) = &config.theme_file {
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<ThemeOverride>(&raw) {
                Ok(overrides) => {
                    if let Some(name) = overrides.theme {
                        if config.no_color {
                            log_debug("theme file ignored: --no-color is set");
                        } else if let Some(parsed) = Theme::from_name(&name) {
                            theme = parsed;
                        } else {
                            log_debug(&format!("theme file names unknown theme {name:?}"));
                        }
                    }
                    border_override = overrides.border.as_deref().and_then(border_from_name);
                }
                Err(err) => {
                    log_debug(&format!("theme file {} unparsable: {err}", path.display()));
                }
            },
            Err(err) => {
                log_debug(&format!(
                    "theme file {} not loaded: {err}; using built-in styling",
                    path.display()
                ));
            }
        }
    }

    let mut colors = theme.colors();
    if let Some(borders) = border_override {
        colors.borders = borders;
    }
    colors
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn config(args: &[&str]) -> AppConfig {
        let mut full = vec!["chatbar"];
        full.extend_from_slice(args);
        AppConfig::parse_from(full)
    }

    #[test]
    fn theme_names_round_trip() {
        for name in ["coral", "catppuccin", "dracula", "nord", "ansi", "none"] {
            let theme = Theme::from_name(name).expect("known theme");
            assert_eq!(theme.to_string(), name);
        }
        assert_eq!(Theme::from_name("mystery"), None);
    }

    #[test]
    fn no_color_forces_plain_palette() {
        let colors = resolve_colors(&config(&["--no-color", "--theme", "dracula"]));
        assert_eq!(colors, THEME_NONE);
    }

    #[test]
    fn missing_theme_file_falls_back() {
        let colors = resolve_colors(&config(&[
            "--theme",
            "nord",
            "--theme-file",
            "/nonexistent/chatbar-theme.json",
        ]));
        assert_eq!(colors, THEME_NORD);
    }

    #[test]
    fn malformed_theme_file_falls_back() {
        let mut file = tempfile_with_contents("{not json");
        let path = file.1.clone();
        let colors = resolve_colors(&config(&["--theme", "coral", "--theme-file", &path]));
        assert_eq!(colors, THEME_CORAL);
        let _ = file.0.flush();
    }

    #[test]
    fn theme_file_overrides_palette_and_border() {
        let file = tempfile_with_contents(r#"{"theme": "dracula", "border": "double"}"#);
        let colors = resolve_colors(&config(&["--theme", "coral", "--theme-file", &file.1]));
        assert_eq!(colors.accent, THEME_DRACULA.accent);
        assert_eq!(colors.borders, BORDER_DOUBLE);
    }

    fn tempfile_with_contents(contents: &str) -> (std::fs::File, String) {
        let path = std::env::temp_dir().join(format!(
            "chatbar-theme-test-{}-{}.json",
            std::process::id(),
            contents.len()
        ));
        let mut file = std::fs::File::create(&path).expect("create temp theme file");
        file.write_all(contents.as_bytes()).expect("write theme file");
        (file, path.to_string_lossy().to_string())
    }
}
