//! Ordered installation of the selected components.
//!
//! The sequencer sorts the selection by precedence rank, drives one install
//! routine per component and records every outcome in a [`RunState`] that it
//! hands back to the caller. A failing routine never stops the run; whether to
//! go on is left to a [`RecoveryPolicy`].

use crate::metrics::Metrics;
use crate::models::{Component, ComponentOutcome, RunState, SelectionSet};
use crate::services::installers::InstallRoutine;
use crate::state::RunFiles;
use crate::ui::progress::Spinner;
use std::time::Instant;

/// Receives progress updates. Every call is self-contained.
pub trait ProgressSink {
    fn show_progress(&self, current: usize, total: usize, label: &str);
}

/// Decision taken after a component-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    Continue,
    Abort,
}

/// Decides whether the run goes on after something failed.
pub trait RecoveryPolicy {
    fn on_failure(&self, step: &str, error: &str) -> RecoveryDecision;
}

/// Components to install, in order, plus selected ids the catalog does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan<'a> {
    pub ordered: Vec<&'a Component>,
    pub unhandled: Vec<String>,
}

/// Order a selection against a catalog.
///
/// Catalog entries are filtered down to the selection (keeping catalog order)
/// and then stable-sorted by rank, so equal ranks keep their catalog order and
/// unranked components come last.
pub fn plan<'a>(selected: &SelectionSet, catalog: &'a [Component]) -> Plan<'a> {
    let mut ordered: Vec<&Component> = catalog.iter().filter(|c| selected.contains(c.id)).collect();
    ordered.sort_by_key(|c| c.order_key());

    let unhandled = selected
        .iter()
        .filter(|id| !catalog.iter().any(|c| c.id == *id))
        .map(str::to_string)
        .collect();

    Plan { ordered, unhandled }
}

/// Drives install routines one at a time.
#[derive(Debug)]
pub struct Sequencer {
    dry_run: bool,
    spinner: bool,
    run_files: Option<RunFiles>,
    metrics: Metrics,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            dry_run: false,
            spinner: true,
            run_files: None,
            metrics: Metrics::new(),
        }
    }

    /// Log what would be installed instead of running routines.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Show the advisory spinner while a routine runs.
    pub fn spinner(mut self, enabled: bool) -> Self {
        self.spinner = enabled;
        self
    }

    /// Mirror selection, progress and errors into run files.
    pub fn run_files(mut self, files: RunFiles) -> Self {
        self.run_files = Some(files);
        self
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Whether a spinner is drawn while `component` installs. Routines that
    /// may prompt on the terminal get none so the prompt stays readable.
    pub fn shows_spinner<R: InstallRoutine>(&self, routine: &R, component: &Component) -> bool {
        if !self.spinner {
            return false;
        }
        let prompts = routine.may_prompt(component);
        if prompts {
            tracing::debug!("No spinner for {}, it may prompt", component.id);
        }
        !prompts
    }

    /// Install the selected components.
    ///
    /// # Returns
    /// The final [`RunState`]: one result per selected id, progress at 100%
    pub async fn run<R, P, F>(
        &self,
        selected: SelectionSet,
        catalog: &[Component],
        routine: &R,
        progress: &P,
        policy: &F,
    ) -> RunState
    where
        R: InstallRoutine,
        P: ProgressSink + ?Sized,
        F: RecoveryPolicy + ?Sized,
    {
        let Plan { ordered, unhandled } = plan(&selected, catalog);
        let mut state = RunState::new(selected, ordered.len());

        if let Some(files) = &self.run_files {
            self.log_file_error(files.write_selection(state.selected()));
        }

        for id in unhandled {
            tracing::warn!("Unhandled component '{}', skipping", id);
            state.record(id, ComponentOutcome::Skipped);
            self.metrics.record_skipped();
        }

        tracing::info!(
            "Installing {} component(s): {}",
            ordered.len(),
            ordered.iter().map(|c| c.id).collect::<Vec<_>>().join(", ")
        );

        let mut remaining = ordered.into_iter();
        while let Some(component) = remaining.next() {
            let step = state.advance();
            self.report_progress(progress, step, state.total_steps(), component.label);

            if self.dry_run {
                tracing::info!("[dry run] would install {}", component.id);
                state.record(component.id, ComponentOutcome::Skipped);
                self.metrics.record_skipped();
                continue;
            }

            tracing::info!("[{}/{}] Installing {}", step, state.total_steps(), component.label);

            let started = Instant::now();
            let result = {
                let _spinner = self
                    .shows_spinner(routine, component)
                    .then(|| Spinner::start(format!("Installing {}", component.label)));
                routine.install(component).await
            };
            self.metrics.record_install_time(started.elapsed());

            match result {
                Ok(()) => {
                    tracing::info!("{} installed", component.label);
                    state.record(component.id, ComponentOutcome::Succeeded);
                    self.metrics.record_succeeded();
                }
                Err(e) => {
                    let message = format!("{}: {}", component.id, e);
                    tracing::error!("Failed to install {}: {}", component.label, e);
                    state.record(component.id, ComponentOutcome::Failed);
                    state.record_error(message.clone());
                    self.metrics.record_failed();
                    if let Some(files) = &self.run_files {
                        self.log_file_error(files.append_error(&message));
                    }

                    if policy.on_failure(component.label, &e.to_string()) == RecoveryDecision::Abort {
                        tracing::warn!("Run aborted after {} failed", component.id);
                        state.mark_aborted();
                        for rest in remaining.by_ref() {
                            state.record(rest.id, ComponentOutcome::Skipped);
                            self.metrics.record_skipped();
                        }
                    }
                }
            }
        }

        state.finish();
        self.report_progress(progress, state.total_steps(), state.total_steps(), "Done");

        tracing::info!("Installation finished: {}", state.summary());
        self.metrics.log_summary();
        state
    }

    fn report_progress<P: ProgressSink + ?Sized>(&self, sink: &P, current: usize, total: usize, label: &str) {
        sink.show_progress(current, total, label);
        self.metrics.record_progress_update();
        if let Some(files) = &self.run_files {
            self.log_file_error(files.write_progress(current, total));
        }
    }

    fn log_file_error(&self, result: anyhow::Result<()>) {
        if let Err(e) = result {
            tracing::warn!("Failed to update run files: {:#}", e);
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(id: &'static str, rank: Option<u32>) -> Component {
        Component {
            id,
            label: id,
            description: "",
            default_selected: false,
            precedence_rank: rank,
        }
    }

    #[test]
    fn test_plan_orders_by_rank_then_catalog() {
        let catalog = vec![
            component("fonts", None),
            component("rust", Some(2)),
            component("python", Some(2)),
            component("mise", Some(1)),
        ];
        let selected: SelectionSet = ["fonts", "rust", "python", "mise"].into_iter().collect();

        let plan = plan(&selected, &catalog);
        let ids: Vec<_> = plan.ordered.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["mise", "rust", "python", "fonts"]);
        assert!(plan.unhandled.is_empty());
    }

    #[test]
    fn test_plan_reports_unhandled_ids() {
        let catalog = vec![component("mise", Some(1))];
        let selected: SelectionSet = ["mise", "cobol"].into_iter().collect();

        let plan = plan(&selected, &catalog);
        assert_eq!(plan.ordered.len(), 1);
        assert_eq!(plan.unhandled, vec!["cobol".to_string()]);
    }

    #[test]
    fn test_plan_empty_selection() {
        let catalog = vec![component("mise", Some(1))];
        let plan = plan(&SelectionSet::new(), &catalog);
        assert!(plan.ordered.is_empty());
        assert!(plan.unhandled.is_empty());
    }
}
