//! Filesystem layout for the installer.
//!
//! ```text
//! ~/.devsetup/
//! ├── logs/      # devsetup_<timestamp>.log, one per run
//! └── backups/   # backup_<timestamp>/ snapshots, never auto-deleted
//!
//! $TMPDIR/devsetup/   # run-scoped files, truncated at the start of each run
//! ├── selected_components
//! ├── progress
//! └── errors
//!
//! ./config/settings.toml   # installer settings (overridable with --config)
//! ```

use camino::Utf8PathBuf;
use std::path::{Path, PathBuf};

/// Settings file used when `--config` is not given.
pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.toml";

/// Dotfiles and config directories captured by a backup, relative to `$HOME`.
pub const BACKUP_TARGETS: &[&str] = &[
    ".bashrc",
    ".bash_profile",
    ".profile",
    ".zshrc",
    ".zprofile",
    ".gitconfig",
    ".vimrc",
    ".tmux.conf",
    ".config/nvim",
    ".config/mise",
    ".config/starship.toml",
];

/// Resolved directories for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    home: PathBuf,
    root: PathBuf,
    run_dir: PathBuf,
}

impl Layout {
    /// Layout rooted at the current user's home directory.
    ///
    /// Returns `None` when the home directory cannot be determined.
    pub fn discover() -> Option<Self> {
        let home = dirs::home_dir()?;
        Some(Self::with_home(home, std::env::temp_dir().join("devsetup")))
    }

    /// Layout rooted at an explicit home and run directory.
    pub fn with_home(home: impl Into<PathBuf>, run_dir: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            root: home.join(".devsetup"),
            home,
            run_dir: run_dir.into(),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// `~/.devsetup/`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `~/.devsetup/logs/`
    pub fn log_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// `~/.devsetup/backups/`
    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// `$TMPDIR/devsetup/`
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Backup targets as home-relative paths
    pub fn backup_targets(&self) -> Vec<PathBuf> {
        BACKUP_TARGETS.iter().map(PathBuf::from).collect()
    }
}

/// Settings path from `--config`, falling back to [`DEFAULT_SETTINGS_PATH`].
pub fn settings_path(cli_override: Option<&str>) -> Utf8PathBuf {
    Utf8PathBuf::from(cli_override.unwrap_or(DEFAULT_SETTINGS_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_home() {
        let layout = Layout::with_home("/home/dev", "/tmp/devsetup");
        assert_eq!(layout.root(), Path::new("/home/dev/.devsetup"));
        assert_eq!(layout.log_dir(), PathBuf::from("/home/dev/.devsetup/logs"));
        assert_eq!(layout.backup_dir(), PathBuf::from("/home/dev/.devsetup/backups"));
        assert_eq!(layout.run_dir(), Path::new("/tmp/devsetup"));
    }

    #[test]
    fn test_settings_path_override() {
        assert_eq!(settings_path(None), Utf8PathBuf::from("config/settings.toml"));
        assert_eq!(settings_path(Some("/etc/dev.toml")), Utf8PathBuf::from("/etc/dev.toml"));
    }

    #[test]
    fn test_backup_targets_are_relative() {
        let layout = Layout::with_home("/home/dev", "/tmp/devsetup");
        assert!(layout.backup_targets().iter().all(|p| p.is_relative()));
    }
}
