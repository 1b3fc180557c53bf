//! Dotfile snapshots taken before the installer touches anything.
//!
//! Each snapshot is a directory `backup_<YYYYmmdd_HHMMSS>` under the backup
//! root holding home-relative copies of the targets that existed at capture
//! time. Snapshots are never deleted or overwritten by this module; two
//! backups in the same second get `_1`, `_2`... suffixes.

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

const SNAPSHOT_PREFIX: &str = "backup_";

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("No backups found in {0}")]
    NoSnapshots(PathBuf),

    #[error("No backup selected")]
    NoSelection,

    #[error("Backup {index} does not exist ({available} available)")]
    IndexOutOfRange { index: usize, available: usize },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BackupError + '_ {
    move |source| BackupError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One snapshot directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSnapshot {
    pub name: String,
    pub path: PathBuf,
    /// Home-relative entries copied into the snapshot
    pub entries: Vec<PathBuf>,
    /// Targets that existed but could not be copied, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

/// Creates, lists and restores snapshots for one home directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    home: PathBuf,
    backup_root: PathBuf,
}

impl BackupManager {
    pub fn new(home: impl Into<PathBuf>, backup_root: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            backup_root: backup_root.into(),
        }
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Snapshot every existing target.
    ///
    /// `targets` are relative to the home directory. Missing targets are
    /// skipped; a target that exists but fails to copy is recorded in
    /// [`BackupSnapshot::failures`] and the rest are still copied.
    ///
    /// # Errors
    /// [`BackupError::Io`] when the snapshot directory itself cannot be created
    pub fn backup<P: AsRef<Path>>(&self, targets: &[P]) -> Result<BackupSnapshot, BackupError> {
        fs::create_dir_all(&self.backup_root).map_err(io_error(&self.backup_root))?;

        let name = self.fresh_snapshot_name(Local::now());
        let path = self.backup_root.join(&name);
        fs::create_dir(&path).map_err(io_error(&path))?;

        tracing::info!("Creating backup {}", path.display());

        let mut snapshot = BackupSnapshot {
            name,
            path,
            entries: Vec::new(),
            failures: Vec::new(),
        };

        for target in targets {
            let relative = target.as_ref();
            let source = self.home.join(relative);

            if fs::symlink_metadata(&source).is_err() {
                tracing::debug!("Backup target {} does not exist, skipping", source.display());
                continue;
            }

            match copy_entry(&source, &snapshot.path.join(relative)) {
                Ok(()) => {
                    tracing::debug!("Backed up {}", relative.display());
                    snapshot.entries.push(relative.to_path_buf());
                }
                Err(e) => {
                    tracing::warn!("Failed to back up {}: {}", source.display(), e);
                    snapshot.failures.push((relative.to_path_buf(), e.to_string()));
                }
            }
        }

        tracing::info!(
            "Backup {} complete: {} entries, {} failures",
            snapshot.name,
            snapshot.entries.len(),
            snapshot.failures.len()
        );
        Ok(snapshot)
    }

    /// Existing snapshots sorted by name (oldest first).
    pub fn list_snapshots(&self) -> Result<Vec<BackupSnapshot>, BackupError> {
        if !self.backup_root.exists() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&self.backup_root).map_err(io_error(&self.backup_root))? {
            let entry = entry.map_err(io_error(&self.backup_root))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(SNAPSHOT_PREFIX) || !entry.path().is_dir() {
                continue;
            }

            let path = entry.path();
            let entries = top_level_entries(&path)?;
            snapshots.push(BackupSnapshot {
                name,
                path,
                entries,
                failures: Vec::new(),
            });
        }

        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(snapshots)
    }

    /// Pick a snapshot by 1-based index as shown by [`Self::list_snapshots`].
    ///
    /// # Errors
    /// [`BackupError::NoSelection`] for `None` (the caller cancelled),
    /// [`BackupError::IndexOutOfRange`] for a bad index
    pub fn select_snapshot(&self, index: Option<usize>) -> Result<BackupSnapshot, BackupError> {
        let mut snapshots = self.list_snapshots()?;
        if snapshots.is_empty() {
            return Err(BackupError::NoSnapshots(self.backup_root.clone()));
        }

        let index = index.ok_or(BackupError::NoSelection)?;
        if index == 0 || index > snapshots.len() {
            return Err(BackupError::IndexOutOfRange {
                index,
                available: snapshots.len(),
            });
        }
        Ok(snapshots.swap_remove(index - 1))
    }

    /// Copy every entry of a snapshot back into the home directory.
    ///
    /// Existing files are overwritten in place. Files in the home directory
    /// that are not in the snapshot are left alone, and the snapshot itself is
    /// never modified.
    pub fn restore(&self, snapshot: &BackupSnapshot) -> Result<usize, BackupError> {
        tracing::info!("Restoring backup {}", snapshot.name);

        let mut restored = 0;
        for relative in &snapshot.entries {
            let source = snapshot.path.join(relative);
            let destination = self.home.join(relative);
            copy_entry(&source, &destination)?;
            tracing::debug!("Restored {}", destination.display());
            restored += 1;
        }

        tracing::info!("Restored {} entries from {}", restored, snapshot.name);
        Ok(restored)
    }

    fn fresh_snapshot_name(&self, now: DateTime<Local>) -> String {
        let base = snapshot_name(now);
        if !self.backup_root.join(&base).exists() {
            return base;
        }
        (1..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.backup_root.join(candidate).exists())
            .unwrap_or(base)
    }
}

/// Snapshot directory name for a timestamp.
pub fn snapshot_name(now: DateTime<Local>) -> String {
    format!("{}{}", SNAPSHOT_PREFIX, now.format("%Y%m%d_%H%M%S"))
}

/// Snapshot contents as home-relative paths.
///
/// Files and directories directly inside the snapshot are entries, except for
/// `.config`-style parents, whose children are listed instead so that a
/// restore never touches siblings that were not backed up.
fn top_level_entries(snapshot_dir: &Path) -> Result<Vec<PathBuf>, BackupError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(snapshot_dir).min_depth(1).max_depth(2).sort_by_file_name() {
        let entry = entry.map_err(|e| BackupError::Io {
            path: snapshot_dir.to_path_buf(),
            source: e.into(),
        })?;
        let relative = entry
            .path()
            .strip_prefix(snapshot_dir)
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let is_container = entry.depth() == 1 && entry.file_type().is_dir() && is_container_dir(&relative);
        if is_container {
            continue;
        }
        let parent_is_container = entry.depth() == 2
            && relative
                .parent()
                .is_some_and(is_container_dir);
        if entry.depth() == 1 || parent_is_container {
            entries.push(relative);
        }
    }
    Ok(entries)
}

fn is_container_dir(relative: &Path) -> bool {
    relative == Path::new(".config")
}

/// Copy a file, symlink or directory tree, preserving permission bits.
fn copy_entry(source: &Path, destination: &Path) -> Result<(), BackupError> {
    let metadata = fs::symlink_metadata(source).map_err(io_error(source))?;

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    if metadata.is_dir() {
        copy_tree(source, destination)
    } else {
        copy_file(source, destination, &metadata)
    }
}

fn copy_tree(source: &Path, destination: &Path) -> Result<(), BackupError> {
    // Directory permissions are applied after the copy so read-only
    // directories can still be filled
    let mut dir_permissions = Vec::new();

    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| BackupError::Io {
            path: source.to_path_buf(),
            source: e.into(),
        })?;
        let relative = entry.path().strip_prefix(source).unwrap_or(Path::new(""));
        let target = destination.join(relative);
        let metadata = fs::symlink_metadata(entry.path()).map_err(io_error(entry.path()))?;

        if metadata.is_dir() {
            if target.is_dir() {
                make_owner_writable(&target)?;
            } else {
                fs::create_dir_all(&target).map_err(io_error(&target))?;
            }
            dir_permissions.push((target, metadata.permissions()));
        } else {
            copy_file(entry.path(), &target, &metadata)?;
        }
    }

    for (dir, permissions) in dir_permissions.into_iter().rev() {
        fs::set_permissions(&dir, permissions).map_err(io_error(&dir))?;
    }
    Ok(())
}

/// An existing read-only directory must accept new entries until its saved
/// permissions are put back.
#[cfg(unix)]
fn make_owner_writable(dir: &Path) -> Result<(), BackupError> {
    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(dir).map_err(io_error(dir))?.permissions().mode();
    if mode & 0o200 == 0 {
        fs::set_permissions(dir, fs::Permissions::from_mode(mode | 0o200)).map_err(io_error(dir))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_owner_writable(dir: &Path) -> Result<(), BackupError> {
    let mut permissions = fs::metadata(dir).map_err(io_error(dir))?.permissions();
    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(dir, permissions).map_err(io_error(dir))?;
    }
    Ok(())
}

fn copy_file(source: &Path, destination: &Path, metadata: &fs::Metadata) -> Result<(), BackupError> {
    // Replace rather than write through, so read-only files and symlinks are handled
    if fs::symlink_metadata(destination).is_ok() {
        fs::remove_file(destination).map_err(io_error(destination))?;
    }

    if metadata.file_type().is_symlink() {
        return copy_symlink(source, destination);
    }

    fs::copy(source, destination).map_err(io_error(source))?;
    fs::set_permissions(destination, metadata.permissions()).map_err(io_error(destination))?;
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> Result<(), BackupError> {
    let link = fs::read_link(source).map_err(io_error(source))?;
    std::os::unix::fs::symlink(&link, destination).map_err(io_error(destination))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, destination: &Path) -> Result<(), BackupError> {
    fs::copy(source, destination).map_err(io_error(source))?;
    Ok(())
}
