// Install Controller - runs one installer invocation end to end
//
// This module contains the InstallController which coordinates:
// - InteractionSurface (component selection, progress)
// - BackupManager (snapshot before any mutation)
// - Sequencer + install routine (ordered installation)
// - Validator (post-install checks)
//
// Probing the host and loading settings happen before the controller is
// built, since both can end the process before anything is shown.

use crate::models::{Component, RunState, SelectionSet};
use crate::paths::Layout;
use crate::services::backup::{BackupError, BackupManager, BackupSnapshot};
use crate::services::installers::InstallRoutine;
use crate::services::sequencer::{RecoveryDecision, RecoveryPolicy, Sequencer};
use crate::services::validator::{ValidationReport, Validator};
use crate::state::RunFiles;
use crate::ui::InteractionSurface;
use crate::ui::prompt::{InteractivePolicy, NonInteractivePolicy, prompt_snapshot};

/// Switches for one run, resolved from the command line and settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Skip the menu and install the catalog defaults
    pub non_interactive: bool,
    pub dry_run: bool,
    pub skip_validation: bool,
    /// Snapshot dotfiles before installing
    pub backup: bool,
    /// Advisory spinner while routines run
    pub spinner: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            non_interactive: false,
            dry_run: false,
            skip_validation: false,
            backup: true,
            spinner: true,
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: RunState,
    pub backup: Option<BackupSnapshot>,
    /// `None` when validation was skipped
    pub validation: Option<ValidationReport>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The user chose nothing; no backup was taken and nothing ran
    NothingSelected,
    Completed(RunReport),
    /// The user stopped the run after a failure
    Aborted(RunReport),
}

impl RunOutcome {
    /// Partial failures still exit 0; only an abort is a failed run.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::NothingSelected | RunOutcome::Completed(_) => 0,
            RunOutcome::Aborted(_) => 1,
        }
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::NothingSelected => None,
            RunOutcome::Completed(report) | RunOutcome::Aborted(report) => Some(report),
        }
    }
}

/// Runs selection, backup, installation and validation in that order.
///
/// # Example
/// ```ignore
/// let controller = InstallController::new(layout, catalog(), surface, installer, options)
///     .validator(Validator::new(home, font_dir));
/// let outcome = controller.run().await;
/// std::process::exit(outcome.exit_code());
/// ```
pub struct InstallController<'a, R> {
    layout: Layout,
    catalog: &'a [Component],
    surface: InteractionSurface,
    routine: R,
    policy: Box<dyn RecoveryPolicy>,
    validator: Validator,
    options: RunOptions,
}

impl<'a, R: InstallRoutine> InstallController<'a, R> {
    pub fn new(
        layout: Layout,
        catalog: &'a [Component],
        surface: InteractionSurface,
        routine: R,
        options: RunOptions,
    ) -> Self {
        let policy: Box<dyn RecoveryPolicy> = if options.non_interactive {
            Box::new(NonInteractivePolicy)
        } else {
            Box::new(InteractivePolicy)
        };
        let validator = Validator::new(layout.home(), None);

        Self {
            layout,
            catalog,
            surface,
            routine,
            policy,
            validator,
            options,
        }
    }

    /// Replace the recovery policy chosen from the options.
    pub fn policy(mut self, policy: Box<dyn RecoveryPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub async fn run(&self) -> RunOutcome {
        let selection = self.select();
        if selection.is_empty() {
            tracing::info!("Nothing selected, exiting");
            return RunOutcome::NothingSelected;
        }

        let run_files = match RunFiles::create(self.layout.run_dir()) {
            Ok(files) => Some(files),
            Err(e) => {
                tracing::warn!("Run files unavailable: {:#}", e);
                None
            }
        };

        let backup = match self.backup_step() {
            Ok(backup) => backup,
            Err(message) => {
                let mut state = RunState::new(selection, 0);
                state.record_error(message);
                state.mark_aborted();
                return RunOutcome::Aborted(RunReport {
                    state,
                    backup: None,
                    validation: None,
                });
            }
        };

        if let Some(files) = &run_files {
            for message in &backup.errors {
                if let Err(e) = files.append_error(message) {
                    tracing::warn!("Failed to update run files: {:#}", e);
                }
            }
        }

        let mut sequencer = Sequencer::new()
            .dry_run(self.options.dry_run)
            .spinner(self.options.spinner);
        if let Some(files) = run_files {
            sequencer = sequencer.run_files(files);
        }

        let mut state = sequencer
            .run(
                selection,
                self.catalog,
                &self.routine,
                &self.surface,
                self.policy.as_ref(),
            )
            .await;

        for message in backup.errors {
            state.record_error(message);
        }

        let validation = if self.options.skip_validation {
            tracing::info!("Validation skipped");
            None
        } else {
            Some(self.validator.validate(state.selected()))
        };

        let report = RunReport {
            state,
            backup: backup.snapshot,
            validation,
        };
        if report.state.aborted() {
            RunOutcome::Aborted(report)
        } else {
            RunOutcome::Completed(report)
        }
    }

    fn select(&self) -> SelectionSet {
        if self.options.non_interactive {
            let defaults = SelectionSet::defaults(self.catalog);
            tracing::info!(
                "Non-interactive run, installing defaults: {}",
                defaults.iter().collect::<Vec<_>>().join(", ")
            );
            defaults
        } else {
            self.surface.select_components(self.catalog)
        }
    }

    /// Take the pre-install snapshot.
    ///
    /// Returns `Err` with the failure message when the user aborts after the
    /// snapshot could not be created.
    fn backup_step(&self) -> Result<BackupStep, String> {
        if !self.options.backup {
            tracing::info!("Backup disabled");
            return Ok(BackupStep::default());
        }

        let targets = self.layout.backup_targets();
        if self.options.dry_run {
            tracing::info!("[dry run] would back up {} targets", targets.len());
            return Ok(BackupStep::default());
        }

        let manager = BackupManager::new(self.layout.home(), self.layout.backup_dir());
        match manager.backup(&targets) {
            Ok(snapshot) => {
                let errors = snapshot
                    .failures
                    .iter()
                    .map(|(path, reason)| format!("backup {}: {}", path.display(), reason))
                    .collect();
                Ok(BackupStep {
                    snapshot: Some(snapshot),
                    errors,
                })
            }
            Err(e) => {
                let message = format!("backup: {}", e);
                tracing::error!("Backup failed: {}", e);
                match self.policy.on_failure("Backup", &e.to_string()) {
                    RecoveryDecision::Continue => Ok(BackupStep {
                        snapshot: None,
                        errors: vec![message],
                    }),
                    RecoveryDecision::Abort => Err(message),
                }
            }
        }
    }
}

#[derive(Debug, Default)]
struct BackupStep {
    snapshot: Option<BackupSnapshot>,
    errors: Vec<String>,
}

/// Pick a snapshot for `--restore`.
///
/// With no index, an interactive run shows a picker; a non-interactive run
/// has nothing to pick with and reports [`BackupError::NoSelection`].
pub fn choose_snapshot(
    manager: &BackupManager,
    index: Option<usize>,
    interactive: bool,
) -> Result<BackupSnapshot, BackupError> {
    let index = match index {
        Some(index) => Some(index),
        None if interactive => {
            let snapshots = manager.list_snapshots()?;
            if snapshots.is_empty() {
                return Err(BackupError::NoSnapshots(manager.backup_root().to_path_buf()));
            }
            let names: Vec<String> = snapshots.into_iter().map(|s| s.name).collect();
            prompt_snapshot(&names)
        }
        None => None,
    };
    manager.select_snapshot(index)
}
