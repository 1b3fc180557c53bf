use crate::services::sequencer::{RecoveryDecision, RecoveryPolicy};
use inquire::{Confirm, InquireError, Select};

/// Asks the user whether to go on after a failure.
///
/// If the prompt cannot be shown (no terminal, stdin closed) the run continues.
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractivePolicy;

impl RecoveryPolicy for InteractivePolicy {
    fn on_failure(&self, step: &str, error: &str) -> RecoveryDecision {
        let answer = Confirm::new(&format!("{} failed. Continue with the remaining steps?", step))
            .with_default(true)
            .with_help_message(&first_line(error))
            .prompt();

        match answer {
            Ok(true) => RecoveryDecision::Continue,
            Ok(false) => RecoveryDecision::Abort,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => {
                tracing::info!("Recovery prompt dismissed, aborting");
                RecoveryDecision::Abort
            }
            Err(e) => {
                tracing::debug!("Recovery prompt unavailable ({}), continuing", e);
                RecoveryDecision::Continue
            }
        }
    }
}

/// Never prompts; every failure is recorded and the run goes on.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePolicy;

impl RecoveryPolicy for NonInteractivePolicy {
    fn on_failure(&self, step: &str, _error: &str) -> RecoveryDecision {
        tracing::debug!("Continuing after {} failed (non-interactive)", step);
        RecoveryDecision::Continue
    }
}

/// Let the user pick a snapshot by name.
///
/// # Returns
/// The 1-based index of the chosen snapshot, `None` if the picker was cancelled
pub fn prompt_snapshot(names: &[String]) -> Option<usize> {
    let choice = Select::new("Restore which backup?", names.to_vec())
        .with_starting_cursor(names.len().saturating_sub(1))
        .prompt();

    match choice {
        Ok(name) => names.iter().position(|n| *n == name).map(|i| i + 1),
        Err(e) => {
            tracing::info!("No backup chosen: {}", e);
            None
        }
    }
}

fn first_line(message: &str) -> String {
    message.lines().next().unwrap_or_default().to_string()
}
