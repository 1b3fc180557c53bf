use crate::models::Component;
use crate::services::environment::{BREW_BIN_DIRS, Environment, OsKind, PackageManager};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use thiserror::Error;
use tokio::process::Command;

const HOMEBREW_INSTALL_URL: &str =
    "https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh";
const OH_MY_ZSH_INSTALL_URL: &str =
    "https://raw.githubusercontent.com/ohmyzsh/ohmyzsh/master/tools/install.sh";
const NERD_FONT_URL: &str =
    "https://github.com/ryanoasis/nerd-fonts/releases/latest/download/JetBrainsMono.zip";

/// Errors from a single install routine
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("No install recipe for '{0}' on this system")]
    Unsupported(String),

    #[error("Command exited with code {code:?}: {command}\n{stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Installs one component.
///
/// The sequencer only cares about success or failure; what the routine does
/// to get there is opaque to it.
#[allow(async_fn_in_trait)]
pub trait InstallRoutine {
    async fn install(&self, component: &Component) -> Result<(), InstallError>;

    /// Whether the routine may prompt on the terminal (e.g. for a `sudo`
    /// password). No spinner is drawn over such routines.
    fn may_prompt(&self, _component: &Component) -> bool {
        false
    }
}

/// What to do for one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipe {
    /// Shell commands run in order; the first failure stops the recipe
    Commands(Vec<String>),
    /// Nothing to do here, with the reason logged at info
    Skip(String),
}

/// Install routines backed by package managers and upstream installer scripts.
#[derive(Debug, Clone)]
pub struct ShellInstaller {
    env: Environment,
    home: PathBuf,
    /// Existing `brew` binary, found at construction
    brew: Option<PathBuf>,
}

impl ShellInstaller {
    pub fn new(env: Environment, home: impl Into<PathBuf>) -> Self {
        Self {
            env,
            home: home.into(),
            brew: find_brew(),
        }
    }

    /// Override the detected `brew` binary.
    pub fn with_brew(mut self, brew: Option<PathBuf>) -> Self {
        self.brew = brew;
        self
    }

    /// Build the recipe for a component id.
    ///
    /// # Errors
    /// [`InstallError::Unsupported`] for unknown ids or when a required package manager is missing
    pub fn recipe(&self, id: &str) -> Result<Recipe, InstallError> {
        let recipe = match id {
            "homebrew" => match (self.env.os, &self.brew) {
                (OsKind::Linux, _) => {
                    Recipe::Skip("Homebrew is only installed on macOS".to_string())
                }
                (OsKind::MacOs, Some(brew)) => {
                    Recipe::Skip(format!("Homebrew already installed at {}", brew.display()))
                }
                (OsKind::MacOs, None) => Recipe::Commands(vec![format!(
                    "NONINTERACTIVE=1 /bin/bash -c \"$(curl -fsSL {})\"",
                    HOMEBREW_INSTALL_URL
                )]),
            },
            "essentials" => {
                let pm = self.package_manager(id)?;
                let packages: &[&str] = match pm {
                    PackageManager::Apt => &["build-essential", "git", "curl", "unzip"],
                    PackageManager::Dnf => &["gcc", "gcc-c++", "make", "git", "curl", "unzip"],
                    PackageManager::Pacman => &["base-devel", "git", "curl", "unzip"],
                    PackageManager::Zypper => &["gcc", "gcc-c++", "make", "git", "curl", "unzip"],
                    PackageManager::Brew => &["git", "curl"],
                };
                Recipe::Commands(vec![pm.install_command(packages)])
            }
            "mise" => Recipe::Commands(vec!["curl -fsSL https://mise.run | sh".to_string()]),
            "python" => self.mise_use("python@latest"),
            "node" => self.mise_use("node@lts"),
            "go" => self.mise_use("go@latest"),
            "rust" => Recipe::Commands(vec![
                "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y".to_string(),
            ]),
            "zsh" => {
                let mut commands = Vec::new();
                if which::which("zsh").is_err() {
                    commands.push(self.package_manager(id)?.install_command(&["zsh"]));
                }
                if self.home.join(".oh-my-zsh").exists() {
                    tracing::info!("Oh My Zsh already present, leaving it as is");
                } else {
                    commands.push(format!(
                        "sh -c \"$(curl -fsSL {})\" \"\" --unattended",
                        OH_MY_ZSH_INSTALL_URL
                    ));
                }
                if commands.is_empty() {
                    Recipe::Skip("zsh and Oh My Zsh are already installed".to_string())
                } else {
                    Recipe::Commands(commands)
                }
            }
            "cli-tools" => {
                let cargo = self.home.join(".cargo/bin/cargo");
                let cargo = if cargo.exists() {
                    cargo.display().to_string()
                } else {
                    "cargo".to_string()
                };
                Recipe::Commands(vec![format!("{} install ripgrep fd-find bat", cargo)])
            }
            "fonts" => match self.font_dir() {
                Some(dir) => {
                    let dir = dir.display().to_string();
                    let mut commands = vec![
                        format!("mkdir -p \"{}\"", dir),
                        format!(
                            "tmp=$(mktemp -d) && curl -fsSL -o \"$tmp/font.zip\" {} && unzip -o -q \"$tmp/font.zip\" -d \"{}\" && rm -rf \"$tmp\"",
                            NERD_FONT_URL, dir
                        ),
                    ];
                    if self.env.os == OsKind::Linux {
                        commands.push(format!("fc-cache -f \"{}\" || true", dir));
                    }
                    Recipe::Commands(commands)
                }
                None => Recipe::Skip("no user font directory on this system".to_string()),
            },
            other => return Err(InstallError::Unsupported(other.to_string())),
        };
        Ok(recipe)
    }

    /// User font directory for the host OS
    pub fn font_dir(&self) -> Option<PathBuf> {
        font_dir(self.env.os, &self.home)
    }

    fn package_manager(&self, id: &str) -> Result<PackageManager, InstallError> {
        self.env
            .package_manager
            .ok_or_else(|| InstallError::Unsupported(id.to_string()))
    }

    fn mise_use(&self, tool: &str) -> Recipe {
        let mise = which::which("mise")
            .unwrap_or_else(|_| self.home.join(".local/bin/mise"))
            .display()
            .to_string();
        Recipe::Commands(vec![format!("{} use -g {}", mise, tool)])
    }
}

/// `brew` on PATH or in one of the installer's default locations.
fn find_brew() -> Option<PathBuf> {
    which::which("brew").ok().or_else(|| {
        BREW_BIN_DIRS
            .iter()
            .map(|dir| Path::new(dir).join("brew"))
            .find(|path| path.is_file())
    })
}

/// `~/.local/share/fonts` on Linux, `~/Library/Fonts` on macOS.
pub fn font_dir(os: OsKind, home: &Path) -> Option<PathBuf> {
    match os {
        OsKind::Linux => Some(home.join(".local/share/fonts")),
        OsKind::MacOs => Some(home.join("Library/Fonts")),
    }
}

impl InstallRoutine for ShellInstaller {
    async fn install(&self, component: &Component) -> Result<(), InstallError> {
        match self.recipe(component.id)? {
            Recipe::Skip(reason) => {
                tracing::info!("{}: {}", component.label, reason);
                Ok(())
            }
            Recipe::Commands(commands) => {
                for command in &commands {
                    run_shell(command).await?;
                }
                Ok(())
            }
        }
    }

    fn may_prompt(&self, component: &Component) -> bool {
        match self.recipe(component.id) {
            Ok(Recipe::Commands(commands)) => commands.iter().any(|c| c.contains("sudo ")),
            _ => false,
        }
    }
}

/// Run one command through `sh -c`, capturing its output into the log.
pub async fn run_shell(command: &str) -> Result<(), InstallError> {
    tracing::info!("Executing: {}", command);
    let start = Instant::now();

    let output = Command::new("sh")
        .args(["-c", command])
        .stdin(Stdio::inherit())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| InstallError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stdout.lines() {
        tracing::debug!(target: "devsetup::installer", "{}", line);
    }
    for line in stderr.lines() {
        tracing::debug!(target: "devsetup::installer", "{}", line);
    }

    tracing::info!(
        "Command completed in {:.2}s with status {}",
        start.elapsed().as_secs_f32(),
        output.status
    );

    if output.status.success() {
        return Ok(());
    }

    // Last few stderr lines are enough for the summary; the rest is in the log
    let lines: Vec<&str> = stderr.lines().collect();
    let tail = lines[lines.len().saturating_sub(5)..].join("\n");
    Err(InstallError::CommandFailed {
        command: command.to_string(),
        code: output.status.code(),
        stderr: tail,
    })
}
