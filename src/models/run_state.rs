use crate::models::SelectionSet;
use indexmap::IndexMap;
use std::fmt;

/// Result of attempting a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentOutcome {
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for ComponentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentOutcome::Succeeded => "succeeded",
            ComponentOutcome::Failed => "failed",
            ComponentOutcome::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// State of one installer invocation.
///
/// Created by the sequencer at the start of a run and handed back to the
/// caller when the run ends. Progress counters only move forward and
/// `errors_occurred` is sticky: once set it is never cleared.
#[derive(Clone, Debug, Default)]
pub struct RunState {
    selected: SelectionSet,

    // Progress
    completed_steps: usize,
    total_steps: usize,

    // Errors
    errors_occurred: bool,
    errors: Vec<String>,
    aborted: bool,

    // Results, in the order components were attempted
    results: IndexMap<String, ComponentOutcome>,
}

impl RunState {
    pub fn new(selected: SelectionSet, total_steps: usize) -> Self {
        Self {
            selected,
            total_steps,
            ..Self::default()
        }
    }

    pub fn selected(&self) -> &SelectionSet {
        &self.selected
    }

    pub fn completed_steps(&self) -> usize {
        self.completed_steps
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn errors_occurred(&self) -> bool {
        self.errors_occurred
    }

    /// Every error message recorded during the run, oldest first
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn aborted(&self) -> bool {
        self.aborted
    }

    pub fn results(&self) -> &IndexMap<String, ComponentOutcome> {
        &self.results
    }

    pub fn outcome(&self, id: &str) -> Option<ComponentOutcome> {
        self.results.get(id).copied()
    }

    /// Move to the next step, never past `total_steps`.
    pub fn advance(&mut self) -> usize {
        if self.completed_steps < self.total_steps {
            self.completed_steps += 1;
        }
        self.completed_steps
    }

    /// Mark every step done. Used for the terminal 100% signal.
    pub fn finish(&mut self) {
        self.completed_steps = self.total_steps;
    }

    pub fn record(&mut self, id: impl Into<String>, outcome: ComponentOutcome) {
        self.results.insert(id.into(), outcome);
    }

    /// Record an error message and raise the sticky error flag.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors_occurred = true;
        self.errors.push(message.into());
    }

    pub fn mark_aborted(&mut self) {
        self.aborted = true;
    }

    /// Counts of (succeeded, failed, skipped) components.
    pub fn outcome_counts(&self) -> (usize, usize, usize) {
        self.results
            .values()
            .fold((0, 0, 0), |(ok, failed, skipped), outcome| match outcome {
                ComponentOutcome::Succeeded => (ok + 1, failed, skipped),
                ComponentOutcome::Failed => (ok, failed + 1, skipped),
                ComponentOutcome::Skipped => (ok, failed, skipped + 1),
            })
    }

    /// Ids that ended in the given outcome, in attempt order.
    pub fn ids_with(&self, outcome: ComponentOutcome) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, o)| **o == outcome)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// One-line summary such as "3 succeeded, 1 failed, 0 skipped".
    pub fn summary(&self) -> String {
        let (ok, failed, skipped) = self.outcome_counts();
        format!("{} succeeded, {} failed, {} skipped", ok, failed, skipped)
    }
}
