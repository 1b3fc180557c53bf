//! Integration tests for BackupManager
//!
//! These tests verify:
//! - Backup followed by restore brings back identical bytes and permissions
//! - Targets missing at backup time stay missing after restore
//! - Snapshots are never overwritten or deleted

use devsetup::paths::BACKUP_TARGETS;
use devsetup::services::backup::{BackupError, BackupManager};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    home: PathBuf,
    manager: BackupManager,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("home");
    fs::create_dir_all(&home).unwrap();
    let manager = BackupManager::new(&home, home.join(".devsetup/backups"));
    Fixture {
        _temp: temp,
        home,
        manager,
    }
}

fn write(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[cfg(unix)]
fn mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
}

#[test]
fn test_backup_then_restore_is_byte_identical() {
    let f = fixture();
    let bashrc = f.home.join(".bashrc");
    let init = f.home.join(".config/nvim/init.lua");
    let plugin = f.home.join(".config/nvim/lua/plugins.lua");
    write(&bashrc, b"export PATH=$HOME/bin:$PATH\n");
    write(&init, b"vim.opt.number = true\n");
    write(&plugin, &[0u8, 159, 146, 150, 10]);

    let snapshot = f.manager.backup(BACKUP_TARGETS).unwrap();
    assert!(snapshot.failures.is_empty());

    // The installer rewrites and removes things
    write(&bashrc, b"# clobbered\n");
    fs::remove_file(&plugin).unwrap();

    let restored = f.manager.restore(&snapshot).unwrap();
    assert_eq!(restored, 2);
    assert_eq!(fs::read(&bashrc).unwrap(), b"export PATH=$HOME/bin:$PATH\n");
    assert_eq!(fs::read(&init).unwrap(), b"vim.opt.number = true\n");
    assert_eq!(fs::read(&plugin).unwrap(), vec![0u8, 159, 146, 150, 10]);
}

#[cfg(unix)]
#[test]
fn test_restore_preserves_permissions() {
    let f = fixture();
    let script = f.home.join(".profile");
    let secret = f.home.join(".gitconfig");
    write(&script, b"#!/bin/sh\n");
    write(&secret, b"[credential]\n");
    set_mode(&script, 0o755);
    set_mode(&secret, 0o600);

    let snapshot = f.manager.backup(&[".profile", ".gitconfig"]).unwrap();
    assert_eq!(mode(&snapshot.path.join(".profile")), 0o755);

    set_mode(&script, 0o644);
    set_mode(&secret, 0o644);
    f.manager.restore(&snapshot).unwrap();

    assert_eq!(mode(&script), 0o755);
    assert_eq!(mode(&secret), 0o600);
}

#[cfg(unix)]
#[test]
fn test_restore_into_read_only_directory() {
    let f = fixture();
    let ro = f.home.join(".config/nvim/ro");
    write(&ro.join("file.lua"), b"return {}\n");
    set_mode(&ro, 0o555);

    let snapshot = f.manager.backup(&[".config/nvim"]).unwrap();
    assert!(snapshot.failures.is_empty());
    assert_eq!(mode(&snapshot.path.join(".config/nvim/ro")), 0o555);

    let restored = f.manager.restore(&snapshot).unwrap();
    assert_eq!(restored, 1);
    assert_eq!(fs::read(ro.join("file.lua")).unwrap(), b"return {}\n");
    assert_eq!(mode(&ro), 0o555);

    // Let the temp dir clean up
    set_mode(&ro, 0o755);
    set_mode(&snapshot.path.join(".config/nvim/ro"), 0o755);
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_kept_as_links() {
    let f = fixture();
    write(&f.home.join("dotfiles/zshrc"), b"setopt autocd\n");
    std::os::unix::fs::symlink(f.home.join("dotfiles/zshrc"), f.home.join(".zshrc")).unwrap();

    let snapshot = f.manager.backup(&[".zshrc"]).unwrap();
    let copied = snapshot.path.join(".zshrc");
    assert!(fs::symlink_metadata(&copied).unwrap().file_type().is_symlink());
    assert_eq!(fs::read_link(&copied).unwrap(), f.home.join("dotfiles/zshrc"));
}

#[test]
fn test_absent_targets_stay_absent() {
    let f = fixture();
    write(&f.home.join(".bashrc"), b"alias ll='ls -l'\n");

    let snapshot = f.manager.backup(&[".bashrc", ".zshrc", ".config/mise"]).unwrap();
    assert!(!snapshot.path.join(".zshrc").exists());
    assert!(!snapshot.path.join(".config").exists());

    f.manager.restore(&snapshot).unwrap();
    assert!(!f.home.join(".zshrc").exists());
    assert!(!f.home.join(".config/mise").exists());
}

#[test]
fn test_consecutive_backups_get_distinct_snapshots() {
    let f = fixture();
    write(&f.home.join(".vimrc"), b"set nocompatible\n");

    let first = f.manager.backup(&[".vimrc"]).unwrap();
    write(&f.home.join(".vimrc"), b"set compatible\n");
    let second = f.manager.backup(&[".vimrc"]).unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(fs::read(first.path.join(".vimrc")).unwrap(), b"set nocompatible\n");
    assert_eq!(fs::read(second.path.join(".vimrc")).unwrap(), b"set compatible\n");

    let listed = f.manager.list_snapshots().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].name, first.name);
}

#[test]
fn test_restore_keeps_snapshot() {
    let f = fixture();
    write(&f.home.join(".tmux.conf"), b"set -g mouse on\n");
    f.manager.backup(&[".tmux.conf"]).unwrap();

    let snapshot = f.manager.select_snapshot(Some(1)).unwrap();
    f.manager.restore(&snapshot).unwrap();
    f.manager.restore(&snapshot).unwrap();

    assert!(snapshot.path.join(".tmux.conf").exists());
    assert_eq!(f.manager.list_snapshots().unwrap().len(), 1);
}

#[test]
fn test_restore_from_listed_snapshot_leaves_config_siblings() {
    let f = fixture();
    write(&f.home.join(".config/nvim/init.lua"), b"-- old\n");
    f.manager.backup(&[".config/nvim"]).unwrap();

    write(&f.home.join(".config/nvim/init.lua"), b"-- new\n");
    write(&f.home.join(".config/other/app.toml"), b"keep = true\n");

    let snapshot = f.manager.select_snapshot(Some(1)).unwrap();
    f.manager.restore(&snapshot).unwrap();

    assert_eq!(fs::read(f.home.join(".config/nvim/init.lua")).unwrap(), b"-- old\n");
    assert_eq!(fs::read(f.home.join(".config/other/app.toml")).unwrap(), b"keep = true\n");
}

#[test]
fn test_bad_index_is_an_error_not_a_panic() {
    let f = fixture();
    write(&f.home.join(".bashrc"), b"\n");
    f.manager.backup(&[".bashrc"]).unwrap();

    let err = f.manager.select_snapshot(Some(5)).unwrap_err();
    assert!(matches!(err, BackupError::IndexOutOfRange { index: 5, available: 1 }));
    assert!(err.to_string().contains("1 available"));
}

#[test]
fn test_backup_root_unwritable_is_reported() {
    let f = fixture();
    // A file where the backup root should be
    write(&f.home.join("blocked"), b"");
    let manager = BackupManager::new(&f.home, f.home.join("blocked/backups"));

    let err = manager.backup(&[".bashrc"]).unwrap_err();
    assert!(matches!(err, BackupError::Io { .. }));
}
