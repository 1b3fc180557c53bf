use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Installer settings from `config/settings.toml`.
///
/// Every key is optional; anything missing keeps its built-in default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Which terminal UI toolkit renders the menu (`auto` lets the probe pick)
    pub ui_framework: UiFramework,

    /// Named palette for console output
    pub theme: Theme,

    /// Log verbosity when no CLI flag overrides it
    pub log_level: LogLevel,

    /// Snapshot dotfiles before installing
    pub backup_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ui_framework: UiFramework::Auto,
            theme: Theme::Default,
            log_level: LogLevel::Info,
            backup_enabled: true,
        }
    }
}

/// Error returned when a settings value names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

/// Presentation backend for the selection menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiFramework {
    Auto,
    /// Graphical dialog
    Zenity,
    Whiptail,
    Dialog,
    /// Fuzzy-filter list
    Fzf,
    /// Numbered list on stdin/stdout
    Plain,
}

impl UiFramework {
    /// Name of the binary backing this framework, if any.
    pub fn binary(&self) -> Option<&'static str> {
        match self {
            UiFramework::Zenity => Some("zenity"),
            UiFramework::Whiptail => Some("whiptail"),
            UiFramework::Dialog => Some("dialog"),
            UiFramework::Fzf => Some("fzf"),
            UiFramework::Auto | UiFramework::Plain => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UiFramework::Auto => "auto",
            UiFramework::Zenity => "zenity",
            UiFramework::Whiptail => "whiptail",
            UiFramework::Dialog => "dialog",
            UiFramework::Fzf => "fzf",
            UiFramework::Plain => "plain",
        }
    }
}

impl fmt::Display for UiFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UiFramework {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(UiFramework::Auto),
            "zenity" | "gui" => Ok(UiFramework::Zenity),
            "whiptail" => Ok(UiFramework::Whiptail),
            "dialog" => Ok(UiFramework::Dialog),
            "fzf" => Ok(UiFramework::Fzf),
            "plain" | "text" | "none" => Ok(UiFramework::Plain),
            other => Err(UnknownValue {
                kind: "ui framework",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Default,
    Dark,
    Light,
    Mono,
}

impl FromStr for Theme {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Theme::Default),
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            "mono" | "monochrome" => Ok(Theme::Mono),
            other => Err(UnknownValue {
                kind: "theme",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(UnknownValue {
                kind: "log level",
                value: other.to_string(),
            }),
        }
    }
}
