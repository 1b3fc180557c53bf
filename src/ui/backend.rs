//! Selection backends.
//!
//! One implementation per presentation toolkit, all behind
//! [`SelectionBackend`]. Cancelling a dialog is not an error: it yields an
//! empty selection.

use crate::models::{Component, UiFramework};
use crate::ui::progress::{percent, render_bar};
use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};
use thiserror::Error;

const DIALOG_TITLE: &str = "Development Environment Setup";
const DIALOG_PROMPT: &str = "Select the components to install";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{0} is not installed")]
    Unavailable(&'static str),

    #[error("Failed to run {binary}: {source}")]
    Io {
        binary: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{binary} exited with code {code:?}")]
    Status { binary: &'static str, code: Option<i32> },
}

/// One row of the checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    pub description: String,
    pub checked: bool,
}

impl From<&Component> for MenuItem {
    fn from(component: &Component) -> Self {
        Self {
            id: component.id.to_string(),
            label: component.label.to_string(),
            description: component.description.to_string(),
            checked: component.default_selected,
        }
    }
}

/// A presentation toolkit able to show the checklist and progress.
#[cfg_attr(test, mockall::automock)]
pub trait SelectionBackend {
    fn kind(&self) -> UiFramework;

    /// Whether the toolkit can be used right now
    fn is_available(&self) -> bool;

    /// Show the checklist and return the chosen ids. Cancel returns an empty list.
    fn select(&self, items: &[MenuItem]) -> Result<Vec<String>, BackendError>;

    /// Self-contained progress update
    fn show_progress(&self, current: usize, total: usize, label: &str) -> Result<(), BackendError>;
}

/// Build the backend for a resolved framework. `Auto` maps to plain text.
pub fn backend_for(kind: UiFramework, color: bool) -> Box<dyn SelectionBackend> {
    match kind {
        UiFramework::Zenity => Box::new(ZenityBackend::new(color)),
        UiFramework::Whiptail => Box::new(TextDialogBackend::whiptail()),
        UiFramework::Dialog => Box::new(TextDialogBackend::dialog()),
        UiFramework::Fzf => Box::new(FzfBackend::new(color)),
        UiFramework::Auto | UiFramework::Plain => Box::new(PlainTextBackend::new(color)),
    }
}

fn binary_on_path(binary: &str) -> bool {
    which::which(binary).is_ok()
}

/// A dialog exit that means "cancelled" rather than "broken"
fn is_cancel(code: Option<i32>) -> bool {
    matches!(code, Some(1) | Some(255) | Some(130))
}

// ---------------------------------------------------------------------------
// Graphical dialog

/// `zenity --list --checklist`
#[derive(Debug, Clone)]
pub struct ZenityBackend {
    color: bool,
}

impl ZenityBackend {
    const BINARY: &'static str = "zenity";

    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn args(items: &[MenuItem]) -> Vec<String> {
        let mut args: Vec<String> = [
            "--list",
            "--checklist",
            "--title",
            DIALOG_TITLE,
            "--text",
            DIALOG_PROMPT,
            "--column=Install",
            "--column=Id",
            "--column=Component",
            "--column=Description",
            "--print-column=2",
            "--hide-column=2",
            "--separator=:",
            "--width=720",
            "--height=480",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        for item in items {
            args.push(if item.checked { "TRUE" } else { "FALSE" }.to_string());
            args.push(item.id.clone());
            args.push(item.label.clone());
            args.push(item.description.clone());
        }
        args
    }
}

impl SelectionBackend for ZenityBackend {
    fn kind(&self) -> UiFramework {
        UiFramework::Zenity
    }

    fn is_available(&self) -> bool {
        binary_on_path(Self::BINARY)
    }

    fn select(&self, items: &[MenuItem]) -> Result<Vec<String>, BackendError> {
        let output = Command::new(Self::BINARY)
            .args(Self::args(items))
            .stderr(Stdio::null())
            .output()
            .map_err(|source| BackendError::Io {
                binary: Self::BINARY,
                source,
            })?;

        if !output.status.success() {
            let code = output.status.code();
            if is_cancel(code) {
                tracing::info!("Selection dialog cancelled");
                return Ok(Vec::new());
            }
            return Err(BackendError::Status {
                binary: Self::BINARY,
                code,
            });
        }

        Ok(split_ids(&String::from_utf8_lossy(&output.stdout), ':'))
    }

    fn show_progress(&self, current: usize, total: usize, label: &str) -> Result<(), BackendError> {
        // A zenity progress window only lives as long as its stdin; draw on the terminal instead
        render_bar(current, total, label, self.color);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Text dialogs

/// `whiptail` or `dialog` checklist. Both share the same argument shape.
#[derive(Debug, Clone)]
pub struct TextDialogBackend {
    kind: UiFramework,
    binary: &'static str,
}

impl TextDialogBackend {
    pub fn whiptail() -> Self {
        Self {
            kind: UiFramework::Whiptail,
            binary: "whiptail",
        }
    }

    pub fn dialog() -> Self {
        Self {
            kind: UiFramework::Dialog,
            binary: "dialog",
        }
    }

    pub fn args(items: &[MenuItem]) -> Vec<String> {
        let list_height = items.len().clamp(1, 12);
        let mut args = vec![
            "--title".to_string(),
            DIALOG_TITLE.to_string(),
            "--separate-output".to_string(),
            "--checklist".to_string(),
            DIALOG_PROMPT.to_string(),
            (list_height + 8).to_string(),
            "78".to_string(),
            list_height.to_string(),
        ];
        for item in items {
            args.push(item.id.clone());
            args.push(format!("{} - {}", item.label, item.description));
            args.push(if item.checked { "ON" } else { "OFF" }.to_string());
        }
        args
    }
}

impl SelectionBackend for TextDialogBackend {
    fn kind(&self) -> UiFramework {
        self.kind
    }

    fn is_available(&self) -> bool {
        binary_on_path(self.binary)
    }

    fn select(&self, items: &[MenuItem]) -> Result<Vec<String>, BackendError> {
        // The dialog draws on the terminal and reports the choice on stderr
        let output = Command::new(self.binary)
            .args(Self::args(items))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| BackendError::Io {
                binary: self.binary,
                source,
            })?;

        if !output.status.success() {
            let code = output.status.code();
            if is_cancel(code) {
                tracing::info!("Selection dialog cancelled");
                return Ok(Vec::new());
            }
            return Err(BackendError::Status {
                binary: self.binary,
                code,
            });
        }

        Ok(split_ids(&String::from_utf8_lossy(&output.stderr), '\n'))
    }

    fn show_progress(&self, current: usize, total: usize, label: &str) -> Result<(), BackendError> {
        let pct = percent(current, total);
        let mut child = Command::new(self.binary)
            .args(["--title", DIALOG_TITLE, "--gauge", label, "7", "70", &pct.to_string()])
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| BackendError::Io {
                binary: self.binary,
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // Closing stdin ends the gauge
            writeln!(stdin, "{}", pct).map_err(|source| BackendError::Io {
                binary: self.binary,
                source,
            })?;
        }

        child.wait().map_err(|source| BackendError::Io {
            binary: self.binary,
            source,
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fuzzy-filter list

/// `fzf --multi` over tab-separated lines
#[derive(Debug, Clone)]
pub struct FzfBackend {
    color: bool,
}

impl FzfBackend {
    const BINARY: &'static str = "fzf";

    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Input lines: `id<TAB>label - description [default]`
    pub fn input_lines(items: &[MenuItem]) -> String {
        let mut input = String::new();
        for item in items {
            input.push_str(&item.id);
            input.push('\t');
            input.push_str(&item.label);
            input.push_str(" - ");
            input.push_str(&item.description);
            if item.checked {
                input.push_str(" [default]");
            }
            input.push('\n');
        }
        input
    }

    /// Chosen ids from fzf's output lines
    pub fn parse_output(output: &str) -> Vec<String> {
        output
            .lines()
            .filter_map(|line| line.split('\t').next())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl SelectionBackend for FzfBackend {
    fn kind(&self) -> UiFramework {
        UiFramework::Fzf
    }

    fn is_available(&self) -> bool {
        binary_on_path(Self::BINARY)
    }

    fn select(&self, items: &[MenuItem]) -> Result<Vec<String>, BackendError> {
        let io_err = |source: io::Error| BackendError::Io {
            binary: Self::BINARY,
            source,
        };

        let mut child = Command::new(Self::BINARY)
            .args([
                "--multi",
                "--delimiter=\t",
                "--with-nth=2..",
                "--prompt=components> ",
                "--header=TAB to mark, ENTER to confirm",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(io_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(Self::input_lines(items).as_bytes())
                .map_err(io_err)?;
        }

        let output = child.wait_with_output().map_err(io_err)?;
        if !output.status.success() {
            let code = output.status.code();
            if is_cancel(code) {
                tracing::info!("Selection cancelled");
                return Ok(Vec::new());
            }
            return Err(BackendError::Status {
                binary: Self::BINARY,
                code,
            });
        }

        Ok(Self::parse_output(&String::from_utf8_lossy(&output.stdout)))
    }

    fn show_progress(&self, current: usize, total: usize, label: &str) -> Result<(), BackendError> {
        render_bar(current, total, label, self.color);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Plain text

/// A rejected token from the numbered-list prompt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid choice")]
pub struct InvalidChoice(pub String);

/// Interpret one line typed at the numbered-list prompt.
///
/// Numbers (1-based) separated by spaces or commas pick items, `a` picks
/// everything, `n` picks nothing and an empty line keeps the defaults.
pub fn parse_plain_selection(input: &str, items: &[MenuItem]) -> Result<Vec<String>, InvalidChoice> {
    let input = input.trim();

    if input.is_empty() {
        return Ok(items.iter().filter(|i| i.checked).map(|i| i.id.clone()).collect());
    }
    match input.to_ascii_lowercase().as_str() {
        "a" | "all" => return Ok(items.iter().map(|i| i.id.clone()).collect()),
        "n" | "none" => return Ok(Vec::new()),
        _ => {}
    }

    let mut chosen = Vec::new();
    for token in input.split([' ', ',']).filter(|t| !t.is_empty()) {
        let index: usize = token.parse().map_err(|_| InvalidChoice(token.to_string()))?;
        let item = index
            .checked_sub(1)
            .and_then(|i| items.get(i))
            .ok_or_else(|| InvalidChoice(token.to_string()))?;
        if !chosen.contains(&item.id) {
            chosen.push(item.id.clone());
        }
    }
    Ok(chosen)
}

/// Numbered list on stdin/stdout. Always available.
#[derive(Debug, Clone)]
pub struct PlainTextBackend {
    color: bool,
}

impl PlainTextBackend {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Run the prompt against arbitrary input and output streams.
    ///
    /// Invalid input re-prompts; end of input selects nothing.
    pub fn select_from<R: BufRead, W: Write>(
        &self,
        items: &[MenuItem],
        mut input: R,
        mut output: W,
    ) -> io::Result<Vec<String>> {
        writeln!(output, "{}", DIALOG_PROMPT)?;
        for (index, item) in items.iter().enumerate() {
            let mark = if item.checked { "x" } else { " " };
            writeln!(
                output,
                "  {:>2}) [{}] {:<18} {}",
                index + 1,
                mark,
                item.label,
                item.description
            )?;
        }

        loop {
            write!(
                output,
                "Numbers separated by spaces or commas, 'a' for all, 'n' for none, Enter for defaults: "
            )?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(Vec::new());
            }

            match parse_plain_selection(&line, items) {
                Ok(chosen) => return Ok(chosen),
                Err(e) => writeln!(output, "{}", e)?,
            }
        }
    }
}

impl SelectionBackend for PlainTextBackend {
    fn kind(&self) -> UiFramework {
        UiFramework::Plain
    }

    fn is_available(&self) -> bool {
        true
    }

    fn select(&self, items: &[MenuItem]) -> Result<Vec<String>, BackendError> {
        let stdin = io::stdin();
        self.select_from(items, stdin.lock(), io::stdout())
            .map_err(|source| BackendError::Io {
                binary: "stdin",
                source,
            })
    }

    fn show_progress(&self, current: usize, total: usize, label: &str) -> Result<(), BackendError> {
        render_bar(current, total, label, self.color);
        Ok(())
    }
}

fn split_ids(output: &str, separator: char) -> Vec<String> {
    output
        .split(separator)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn items() -> Vec<MenuItem> {
        vec![
            MenuItem {
                id: "mise".into(),
                label: "mise".into(),
                description: "version manager".into(),
                checked: true,
            },
            MenuItem {
                id: "rust".into(),
                label: "Rust".into(),
                description: "toolchain".into(),
                checked: false,
            },
            MenuItem {
                id: "fonts".into(),
                label: "Fonts".into(),
                description: "nerd font".into(),
                checked: true,
            },
        ]
    }

    #[test]
    fn test_parse_plain_numbers() {
        let items = items();
        assert_eq!(parse_plain_selection("2, 3", &items).unwrap(), vec!["rust", "fonts"]);
        assert_eq!(parse_plain_selection("1 1", &items).unwrap(), vec!["mise"]);
    }

    #[test]
    fn test_parse_plain_shortcuts() {
        let items = items();
        assert_eq!(parse_plain_selection("\n", &items).unwrap(), vec!["mise", "fonts"]);
        assert_eq!(parse_plain_selection("A", &items).unwrap().len(), 3);
        assert!(parse_plain_selection("n", &items).unwrap().is_empty());
    }

    #[test]
    fn test_parse_plain_rejects_bad_tokens() {
        let items = items();
        assert_eq!(parse_plain_selection("0", &items), Err(InvalidChoice("0".into())));
        assert_eq!(parse_plain_selection("4", &items), Err(InvalidChoice("4".into())));
        assert_eq!(parse_plain_selection("1 x", &items), Err(InvalidChoice("x".into())));
    }

    #[test]
    fn test_plain_prompt_reprompts_then_accepts() {
        let backend = PlainTextBackend::new(false);
        let mut out = Vec::new();
        let chosen = backend
            .select_from(&items(), Cursor::new("9\n2\n"), &mut out)
            .unwrap();
        assert_eq!(chosen, vec!["rust"]);

        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("'9' is not a valid choice"));
        assert!(shown.contains("[x] mise"));
    }

    #[test]
    fn test_plain_prompt_eof_selects_nothing() {
        let backend = PlainTextBackend::new(false);
        let chosen = backend
            .select_from(&items(), Cursor::new(""), Vec::new())
            .unwrap();
        assert!(chosen.is_empty());
    }

    #[test]
    fn test_text_dialog_args() {
        let args = TextDialogBackend::args(&items());
        assert!(args.contains(&"--separate-output".to_string()));
        let pos = args.iter().position(|a| a == "rust").unwrap();
        assert_eq!(args[pos + 1], "Rust - toolchain");
        assert_eq!(args[pos + 2], "OFF");
    }

    #[test]
    fn test_zenity_args_mark_defaults() {
        let args = ZenityBackend::args(&items());
        let pos = args.iter().position(|a| a == "mise").unwrap();
        assert_eq!(args[pos - 1], "TRUE");
    }

    #[test]
    fn test_fzf_round_trip_of_lines() {
        let lines = FzfBackend::input_lines(&items());
        assert!(lines.starts_with("mise\tmise - version manager [default]\n"));
        assert_eq!(
            FzfBackend::parse_output("rust\tRust - toolchain\nfonts\tFonts - nerd font [default]\n"),
            vec!["rust", "fonts"]
        );
    }

    #[test]
    fn test_split_ids() {
        assert_eq!(split_ids("mise:rust\n", ':'), vec!["mise", "rust"]);
        assert!(split_ids("", '\n').is_empty());
    }

    #[test]
    fn test_cancel_codes() {
        assert!(is_cancel(Some(1)));
        assert!(is_cancel(Some(255)));
        assert!(!is_cancel(Some(2)));
        assert!(!is_cancel(None));
    }
}
