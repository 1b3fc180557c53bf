//! Post-install checks.
//!
//! The validator looks at the system from scratch rather than trusting the
//! sequencer's results: a routine can exit cleanly and still leave a tool off
//! the PATH of the current process.

use crate::models::SelectionSet;
use crate::services::environment::{BREW_BIN_DIRS, OsKind};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Something a component is expected to leave behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Executable found on the search path
    Binary(&'static str),
    /// Directory relative to the home directory
    Directory(PathBuf),
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Artifact::Binary(name) => write!(f, "binary '{}'", name),
            Artifact::Directory(path) if path.is_absolute() => {
                write!(f, "directory '{}'", path.display())
            }
            Artifact::Directory(path) => write!(f, "directory '~/{}'", path.display()),
        }
    }
}

/// Outcome of a validation pass. Counts are per artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub passed: usize,
    pub failed: usize,
    /// `(component id, artifact)` for every failed check
    pub failures: Vec<(String, String)>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Expected artifacts for a component id; empty for unknown ids.
pub fn expected_artifacts(id: &str, os: OsKind, font_dir: Option<&Path>) -> Vec<Artifact> {
    use Artifact::{Binary, Directory};
    match id {
        "homebrew" if os == OsKind::MacOs => vec![Binary("brew")],
        "homebrew" => Vec::new(),
        "essentials" => vec![Binary("git"), Binary("curl"), Binary("make")],
        "mise" => vec![Binary("mise")],
        "python" => vec![Binary("python3")],
        "node" => vec![Binary("node"), Binary("npm")],
        "rust" => vec![Binary("rustc"), Binary("cargo")],
        "go" => vec![Binary("go")],
        "zsh" => vec![Binary("zsh"), Directory(PathBuf::from(".oh-my-zsh"))],
        "cli-tools" => vec![Binary("rg"), Binary("fd"), Binary("bat")],
        "fonts" => font_dir.map(|dir| vec![Directory(dir.to_path_buf())]).unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Checks installed artifacts for the selected components.
#[derive(Debug, Clone)]
pub struct Validator {
    home: PathBuf,
    search_path: OsString,
    font_dir: Option<PathBuf>,
    os: OsKind,
}

impl Validator {
    /// Validator searching the current PATH plus the per-user bin directories
    /// that installers add to shell profiles.
    pub fn new(home: impl Into<PathBuf>, font_dir: Option<PathBuf>) -> Self {
        let home = home.into();
        let mut dirs: Vec<PathBuf> = std::env::var_os("PATH")
            .map(|path| std::env::split_paths(&path).collect())
            .unwrap_or_default();
        for extra in [".local/bin", ".cargo/bin", ".local/share/mise/shims"] {
            dirs.push(home.join(extra));
        }
        dirs.extend(BREW_BIN_DIRS.iter().map(PathBuf::from));
        let search_path = std::env::join_paths(dirs).unwrap_or_default();
        Self::with_search_path(home, search_path, font_dir)
    }

    /// Validator with an explicit binary search path.
    pub fn with_search_path(
        home: impl Into<PathBuf>,
        search_path: impl Into<OsString>,
        font_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            home: home.into(),
            search_path: search_path.into(),
            font_dir,
            os: if cfg!(target_os = "macos") {
                OsKind::MacOs
            } else {
                OsKind::Linux
            },
        }
    }

    /// Validate for a given OS instead of the build target.
    pub fn os(mut self, os: OsKind) -> Self {
        self.os = os;
        self
    }

    /// Check every artifact of every selected component. Never fails.
    pub fn validate(&self, selected: &SelectionSet) -> ValidationReport {
        let mut report = ValidationReport::default();

        for id in selected.iter() {
            let artifacts = expected_artifacts(id, self.os, self.font_dir.as_deref());
            if artifacts.is_empty() {
                tracing::debug!("No validation checks for {}", id);
                continue;
            }

            for artifact in artifacts {
                if self.check(&artifact) {
                    tracing::debug!("{}: found {}", id, artifact);
                    report.passed += 1;
                } else {
                    tracing::warn!("{}: missing {}", id, artifact);
                    report.failed += 1;
                    report.failures.push((id.to_string(), artifact.to_string()));
                }
            }
        }

        tracing::info!(
            "Validation: {} passed, {} failed",
            report.passed,
            report.failed
        );
        report
    }

    fn check(&self, artifact: &Artifact) -> bool {
        match artifact {
            Artifact::Binary(name) => {
                which::which_in(name, Some(&self.search_path), &self.home).is_ok()
            }
            Artifact::Directory(relative) => self.home.join(relative).is_dir(),
        }
    }
}
