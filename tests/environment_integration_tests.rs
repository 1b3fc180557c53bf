//! Integration tests for host detection and post-install validation
//!
//! These tests verify:
//! - Distro and package manager detection from os-release files
//! - UI toolkit resolution
//! - Validator counts against a scratch search path

use devsetup::models::{SelectionSet, UiFramework};
use devsetup::services::environment::{
    Environment, OsKind, PackageManager, detect_distro, detect_package_manager, select_ui_framework,
};
use devsetup::services::validator::{ValidationReport, Validator};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn os_release(dir: &Path, contents: &str) -> std::path::PathBuf {
    let path = dir.join("os-release");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_fedora_family_uses_dnf() {
    let temp_dir = TempDir::new().unwrap();
    let path = os_release(
        temp_dir.path(),
        "NAME=\"Rocky Linux\"\nID=\"rocky\"\nID_LIKE=\"rhel centos fedora\"\n",
    );

    let distro = detect_distro(&path).unwrap().unwrap();
    assert_eq!(distro.id, "rocky");
    assert_eq!(
        detect_package_manager(OsKind::Linux, Some(&distro), |_| false),
        Some(PackageManager::Dnf)
    );
}

#[test]
fn test_arch_derivative_uses_pacman() {
    let temp_dir = TempDir::new().unwrap();
    let path = os_release(temp_dir.path(), "ID=endeavouros\nID_LIKE=arch\n");

    let distro = detect_distro(&path).unwrap().unwrap();
    assert_eq!(
        detect_package_manager(OsKind::Linux, Some(&distro), |_| false),
        Some(PackageManager::Pacman)
    );
}

#[test]
fn test_unknown_distro_probes_binaries() {
    let temp_dir = TempDir::new().unwrap();
    let path = os_release(temp_dir.path(), "ID=nixos\n");

    let distro = detect_distro(&path).unwrap().unwrap();
    assert_eq!(
        detect_package_manager(OsKind::Linux, Some(&distro), |bin| bin == "zypper"),
        Some(PackageManager::Zypper)
    );
    assert_eq!(detect_package_manager(OsKind::Linux, Some(&distro), |_| false), None);
}

#[test]
fn test_missing_os_release_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    assert!(detect_distro(&temp_dir.path().join("absent")).is_err());
}

#[test]
fn test_resolve_ui_uses_detected_toolkits() {
    let env = Environment {
        os: OsKind::Linux,
        distro: None,
        package_manager: Some(PackageManager::Apt),
        available_ui: vec![UiFramework::Whiptail, UiFramework::Fzf],
        has_display: true,
    };

    assert_eq!(env.resolve_ui(UiFramework::Auto), UiFramework::Whiptail);
    assert_eq!(env.resolve_ui(UiFramework::Plain), UiFramework::Plain);
    assert_eq!(env.resolve_ui(UiFramework::Zenity), UiFramework::Zenity);
}

#[test]
fn test_headless_auto_never_picks_graphical_dialog() {
    assert_eq!(
        select_ui_framework(UiFramework::Auto, false, |_| true),
        UiFramework::Dialog
    );
}

#[cfg(unix)]
fn fake_binary(dir: &Path, name: &str) {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    fs::write(&path, "#!/bin/sh\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_validator_counts_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let home = temp_dir.path().join("home");
    let bin = temp_dir.path().join("bin");
    fs::create_dir_all(&home).unwrap();
    fs::create_dir_all(&bin).unwrap();
    fake_binary(&bin, "rustc");
    fake_binary(&bin, "cargo");
    fake_binary(&bin, "node");

    let validator = Validator::with_search_path(&home, bin.as_os_str(), None);
    let selected: SelectionSet = ["rust", "node"].into_iter().collect();
    let report = validator.validate(&selected);

    // npm is missing
    assert_eq!(report.passed, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures, vec![("node".to_string(), "binary 'npm'".to_string())]);
}

#[test]
fn test_validator_ignores_unselected_components() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join(".oh-my-zsh")).unwrap();

    let validator = Validator::with_search_path(temp_dir.path(), "", None);
    assert_eq!(validator.validate(&SelectionSet::new()), ValidationReport::default());
}

#[test]
fn test_validator_checks_font_directory() {
    let temp_dir = TempDir::new().unwrap();
    let fonts = temp_dir.path().join(".local/share/fonts");
    fs::create_dir_all(&fonts).unwrap();

    let validator = Validator::with_search_path(
        temp_dir.path(),
        "",
        Some(".local/share/fonts".into()),
    );
    let report = validator.validate(&["fonts"].into_iter().collect());
    assert_eq!(report.passed, 1);
    assert!(report.is_clean());
}
