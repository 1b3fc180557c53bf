// Run-scoped files
//
// Three small files describe the run in progress: the selected component ids,
// a progress counter and the error list. They are truncated when a run starts
// and nothing depends on them surviving the run. Only the single thread of
// control writes them, so no locking is needed.

use crate::models::SelectionSet;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const SELECTION_FILE: &str = "selected_components";
const PROGRESS_FILE: &str = "progress";
const ERRORS_FILE: &str = "errors";

/// Ephemeral files for the current run.
#[derive(Debug, Clone)]
pub struct RunFiles {
    dir: PathBuf,
}

impl RunFiles {
    /// Create the run directory and truncate all run files.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create run directory: {}", dir.display()))?;

        let files = Self { dir };
        for name in [SELECTION_FILE, PROGRESS_FILE, ERRORS_FILE] {
            let path = files.dir.join(name);
            fs::write(&path, "")
                .with_context(|| format!("Failed to truncate run file: {}", path.display()))?;
        }

        tracing::debug!("Run files initialized in {}", files.dir.display());
        Ok(files)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the selected component ids, one per line.
    pub fn write_selection(&self, selection: &SelectionSet) -> Result<()> {
        let mut contents = String::new();
        for id in selection.iter() {
            contents.push_str(id);
            contents.push('\n');
        }
        let path = self.dir.join(SELECTION_FILE);
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Overwrite the progress counter with `current/total`.
    pub fn write_progress(&self, current: usize, total: usize) -> Result<()> {
        let path = self.dir.join(PROGRESS_FILE);
        fs::write(&path, format!("{}/{}\n", current, total))
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Append one line to the error list.
    pub fn append_error(&self, message: &str) -> Result<()> {
        let path = self.dir.join(ERRORS_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        // Keep one error per line
        writeln!(file, "{}", message.replace('\n', " "))
            .with_context(|| format!("Failed to append to {}", path.display()))
    }

    pub fn read_selection(&self) -> Result<Vec<String>> {
        self.read_lines(SELECTION_FILE)
    }

    /// Last written progress as `(current, total)`, if any
    pub fn read_progress(&self) -> Result<Option<(usize, usize)>> {
        let path = self.dir.join(PROGRESS_FILE);
        let contents =
            fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(contents.trim().split_once('/').and_then(|(current, total)| {
            Some((current.parse().ok()?, total.parse().ok()?))
        }))
    }

    pub fn read_errors(&self) -> Result<Vec<String>> {
        self.read_lines(ERRORS_FILE)
    }

    fn read_lines(&self, name: &str) -> Result<Vec<String>> {
        let path = self.dir.join(name);
        let contents =
            fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
