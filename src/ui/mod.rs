// UI module - terminal interaction for the installer
//
// This module contains:
// - InteractionSurface: checklist and progress over the chosen backend
// - backend: one SelectionBackend per toolkit plus the plain-text fallback
// - progress: indicatif rendering and the advisory spinner
// - prompt: recovery policies (interactive / non-interactive)
// - controller: InstallController, which runs the whole flow

pub mod backend;
pub mod controller;
pub mod progress;
pub mod prompt;

pub use backend::{BackendError, MenuItem, SelectionBackend, backend_for};
pub use controller::{InstallController, RunOptions, RunOutcome, RunReport};
pub use prompt::{InteractivePolicy, NonInteractivePolicy};

use crate::models::{Component, SelectionSet, Theme, UiFramework};
use crate::services::sequencer::ProgressSink;
use backend::PlainTextBackend;
use colored::{ColoredString, Colorize};

/// Accent colour for console output, derived from the settings theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    theme: Theme,
}

impl Palette {
    pub fn new(theme: Theme) -> Self {
        if theme == Theme::Mono {
            colored::control::set_override(false);
        }
        Self { theme }
    }

    pub fn uses_color(&self) -> bool {
        self.theme != Theme::Mono
    }

    pub fn accent(&self, text: &str) -> ColoredString {
        match self.theme {
            Theme::Default => text.cyan().bold(),
            Theme::Dark => text.bright_magenta().bold(),
            Theme::Light => text.blue().bold(),
            Theme::Mono => text.normal(),
        }
    }

    pub fn success(&self, text: &str) -> ColoredString {
        if self.uses_color() { text.green().bold() } else { text.normal() }
    }

    pub fn warning(&self, text: &str) -> ColoredString {
        if self.uses_color() { text.yellow().bold() } else { text.normal() }
    }
}

/// Checklist and progress display over one backend.
///
/// The backend is chosen once per run. If it turns out to be unusable when
/// called, the surface falls back to the plain-text list for that call.
pub struct InteractionSurface {
    backend: Box<dyn SelectionBackend>,
    fallback: PlainTextBackend,
}

impl InteractionSurface {
    pub fn new(backend: Box<dyn SelectionBackend>, palette: Palette) -> Self {
        Self {
            backend,
            fallback: PlainTextBackend::new(palette.uses_color()),
        }
    }

    /// Surface for a resolved framework
    pub fn for_framework(kind: UiFramework, palette: Palette) -> Self {
        Self::new(backend_for(kind, palette.uses_color()), palette)
    }

    pub fn kind(&self) -> UiFramework {
        self.backend.kind()
    }

    /// Present every catalog entry and return the chosen subset.
    ///
    /// Ids returned by a backend that are not in the catalog are dropped.
    /// An empty result means the user chose nothing.
    pub fn select_components(&self, catalog: &[Component]) -> SelectionSet {
        let items: Vec<MenuItem> = catalog.iter().map(MenuItem::from).collect();

        let chosen = match self.primary_select(&items) {
            Ok(chosen) => chosen,
            Err(e) => {
                tracing::warn!("{}; falling back to plain text", e);
                self.fallback.select(&items).unwrap_or_else(|e| {
                    tracing::error!("Plain text selection failed: {}", e);
                    Vec::new()
                })
            }
        };

        let selection: SelectionSet = chosen
            .into_iter()
            .filter(|id| {
                let known = catalog.iter().any(|c| c.id == id.as_str());
                if !known {
                    tracing::warn!("Ignoring unknown selection '{}'", id);
                }
                known
            })
            .collect();

        if !selection.is_empty() {
            tracing::info!(
                "Selected {} component(s): {}",
                selection.len(),
                selection.iter().collect::<Vec<_>>().join(", ")
            );
        }
        selection
    }

    fn primary_select(&self, items: &[MenuItem]) -> Result<Vec<String>, BackendError> {
        if !self.backend.is_available() {
            return Err(BackendError::Unavailable(
                self.backend.kind().binary().unwrap_or("backend"),
            ));
        }
        self.backend.select(items)
    }
}

impl ProgressSink for InteractionSurface {
    fn show_progress(&self, current: usize, total: usize, label: &str) {
        let shown = self.backend.is_available()
            && match self.backend.show_progress(current, total, label) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!("Progress display failed: {}", e);
                    false
                }
            };
        if !shown {
            // Plain rendering cannot fail
            let _ = self.fallback.show_progress(current, total, label);
        }
    }
}
