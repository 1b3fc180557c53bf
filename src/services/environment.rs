//! Host detection: operating system, distribution, package manager and the
//! best available UI toolkit.
//!
//! All probes are read-only queries. The detection helpers take their inputs
//! (OS string, `/etc/os-release` contents, a binary lookup) as parameters so
//! they can be exercised without touching the real host.
//!
//! # Examples
//!
//! ```ignore
//! use devsetup::services::environment::Environment;
//! use devsetup::models::UiFramework;
//!
//! let env = Environment::probe()?;
//! let ui = env.resolve_ui(UiFramework::Auto);
//! ```

use crate::models::UiFramework;
use anyhow::{Context, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Location of the distribution identification file
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Errors that stop the installer before anything runs
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Unsupported operating system: {0}")]
    UnsupportedOs(String),

    #[error("Could not determine the home directory")]
    NoHomeDirectory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Linux,
    MacOs,
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsKind::Linux => f.write_str("linux"),
            OsKind::MacOs => f.write_str("macos"),
        }
    }
}

/// Linux distribution identity from `/etc/os-release`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Distro {
    pub id: String,
    pub id_like: Vec<String>,
    pub pretty_name: Option<String>,
}

impl Distro {
    /// `id` followed by the `ID_LIKE` family, most specific first
    pub fn family(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(self.id_like.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Pacman,
    Zypper,
    Brew,
}

/// Where the Homebrew installer puts `brew` (Apple Silicon, then Intel).
/// Neither is on PATH until the shell profile is reloaded.
pub const BREW_BIN_DIRS: [&str; 2] = ["/opt/homebrew/bin", "/usr/local/bin"];

impl PackageManager {
    pub fn binary(&self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
            PackageManager::Pacman => "pacman",
            PackageManager::Zypper => "zypper",
            PackageManager::Brew => "brew",
        }
    }

    /// Command that installs `packages` non-interactively.
    pub fn install_command(&self, packages: &[&str]) -> String {
        let list = packages.join(" ");
        match self {
            PackageManager::Apt => format!(
                "sudo apt-get update && sudo DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
                list
            ),
            PackageManager::Dnf => format!("sudo dnf install -y {}", list),
            PackageManager::Pacman => format!("sudo pacman -S --needed --noconfirm {}", list),
            PackageManager::Zypper => format!("sudo zypper --non-interactive install {}", list),
            PackageManager::Brew => format!("PATH=\"{}:$PATH\" brew install {}", BREW_BIN_DIRS.join(":"), list),
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// Snapshot of the host, taken once at startup.
#[derive(Debug, Clone)]
pub struct Environment {
    pub os: OsKind,
    pub distro: Option<Distro>,
    pub package_manager: Option<PackageManager>,
    /// UI toolkits whose binaries were found, in preference order
    pub available_ui: Vec<UiFramework>,
    pub has_display: bool,
}

impl Environment {
    /// Probe the running host.
    ///
    /// # Errors
    /// [`ProbeError::UnsupportedOs`] on anything other than Linux or macOS
    pub fn probe() -> Result<Self, ProbeError> {
        let os = detect_os(std::env::consts::OS)?;

        let distro = match os {
            OsKind::Linux => match detect_distro(Path::new(OS_RELEASE_PATH)) {
                Ok(distro) => distro,
                Err(e) => {
                    tracing::warn!("Could not read {}: {}", OS_RELEASE_PATH, e);
                    None
                }
            },
            OsKind::MacOs => None,
        };

        let package_manager = detect_package_manager(os, distro.as_ref(), binary_available);
        let has_display =
            std::env::var_os("DISPLAY").is_some() || std::env::var_os("WAYLAND_DISPLAY").is_some();
        let available_ui = available_ui_frameworks(binary_available);

        tracing::info!(
            "Detected os={}, distro={}, package_manager={}, display={}",
            os,
            distro.as_ref().map(|d| d.id.as_str()).unwrap_or("-"),
            package_manager.map(|p| p.binary()).unwrap_or("-"),
            has_display
        );
        tracing::debug!("Available UI toolkits: {:?}", available_ui);

        Ok(Self {
            os,
            distro,
            package_manager,
            available_ui,
            has_display,
        })
    }

    /// Pick the UI backend for this run from the settings preference.
    pub fn resolve_ui(&self, preference: UiFramework) -> UiFramework {
        select_ui_framework(preference, self.has_display, |ui| self.available_ui.contains(&ui))
    }
}

/// `which`-based lookup for a binary on the current PATH
pub fn binary_available(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Map `std::env::consts::OS` onto a supported OS.
pub fn detect_os(os: &str) -> Result<OsKind, ProbeError> {
    match os {
        "linux" => Ok(OsKind::Linux),
        "macos" => Ok(OsKind::MacOs),
        other => Err(ProbeError::UnsupportedOs(other.to_string())),
    }
}

/// Read the distribution identity from an os-release file.
///
/// # Returns
/// `None` when the file carries no `ID` line
pub fn detect_distro(os_release_path: &Path) -> Result<Option<Distro>> {
    let file = File::open(os_release_path)
        .with_context(|| format!("Failed to open {}", os_release_path.display()))?;

    let mut distro = Distro::default();

    for line_result in BufReader::new(file).lines() {
        let line = line_result.context("Failed to read line from os-release")?;
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim_matches(|c| c == '"' || c == '\'');

        match key {
            "ID" => distro.id = value.to_lowercase(),
            "ID_LIKE" => {
                distro.id_like = value.split_whitespace().map(str::to_lowercase).collect();
            }
            "PRETTY_NAME" => distro.pretty_name = Some(value.to_string()),
            _ => {}
        }
    }

    if distro.id.is_empty() {
        Ok(None)
    } else {
        Ok(Some(distro))
    }
}

/// Choose the package manager for the host.
///
/// macOS always uses Homebrew (it may still need installing). On Linux the
/// distro family decides; when that is unknown, the first package manager
/// binary found wins.
pub fn detect_package_manager(
    os: OsKind,
    distro: Option<&Distro>,
    is_available: impl Fn(&str) -> bool,
) -> Option<PackageManager> {
    if os == OsKind::MacOs {
        return Some(PackageManager::Brew);
    }

    if let Some(distro) = distro {
        for id in distro.family() {
            let found = match id {
                "debian" | "ubuntu" | "linuxmint" | "pop" | "elementary" | "raspbian" => {
                    Some(PackageManager::Apt)
                }
                "fedora" | "rhel" | "centos" | "rocky" | "almalinux" => Some(PackageManager::Dnf),
                "arch" | "manjaro" | "endeavouros" | "garuda" => Some(PackageManager::Pacman),
                "opensuse" | "opensuse-leap" | "opensuse-tumbleweed" | "suse" | "sles" => {
                    Some(PackageManager::Zypper)
                }
                _ => None,
            };
            if found.is_some() {
                return found;
            }
        }
        tracing::debug!("Unrecognized distro family for {}, probing binaries", distro.id);
    }

    [
        PackageManager::Apt,
        PackageManager::Dnf,
        PackageManager::Pacman,
        PackageManager::Zypper,
        PackageManager::Brew,
    ]
    .into_iter()
    .find(|pm| is_available(pm.binary()))
}

/// UI toolkits present on the host, in `auto` preference order.
pub fn available_ui_frameworks(is_available: impl Fn(&str) -> bool) -> Vec<UiFramework> {
    [
        UiFramework::Zenity,
        UiFramework::Dialog,
        UiFramework::Whiptail,
        UiFramework::Fzf,
    ]
    .into_iter()
    .filter(|ui| ui.binary().is_some_and(&is_available))
    .collect()
}

/// Resolve the settings preference to a concrete backend.
///
/// An explicit choice is honoured even when its binary is missing; the
/// interaction surface degrades to plain text at call time in that case.
/// `auto` picks the first available toolkit, using the graphical dialog only
/// when a display is present.
pub fn select_ui_framework(
    preference: UiFramework,
    has_display: bool,
    is_available: impl Fn(UiFramework) -> bool,
) -> UiFramework {
    if preference != UiFramework::Auto {
        if preference != UiFramework::Plain && !is_available(preference) {
            tracing::warn!(
                "Configured UI framework '{}' is not installed; plain text will be used if it is still missing",
                preference
            );
        }
        return preference;
    }

    let candidates = [
        UiFramework::Zenity,
        UiFramework::Dialog,
        UiFramework::Whiptail,
        UiFramework::Fzf,
    ];

    candidates
        .into_iter()
        .filter(|ui| *ui != UiFramework::Zenity || has_display)
        .find(|ui| is_available(*ui))
        .unwrap_or(UiFramework::Plain)
}
