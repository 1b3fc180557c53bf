//! Integration tests for InstallController
//!
//! These tests drive a whole run against a scratch home directory with a
//! scripted selection backend and a stand-in install routine.

use devsetup::models::{CATALOG, Component, ComponentOutcome, SelectionSet, Theme, UiFramework};
use devsetup::paths::Layout;
use devsetup::services::backup::{BackupError, BackupManager};
use devsetup::services::installers::{InstallError, InstallRoutine};
use devsetup::services::sequencer::{RecoveryDecision, RecoveryPolicy};
use devsetup::services::validator::Validator;
use devsetup::ui::controller::choose_snapshot;
use devsetup::ui::{
    BackendError, InstallController, InteractionSurface, MenuItem, Palette, RunOptions, RunOutcome,
    SelectionBackend,
};
use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use tempfile::TempDir;

/// Returns a fixed answer from the checklist
struct ScriptedBackend {
    answer: Vec<&'static str>,
}

impl SelectionBackend for ScriptedBackend {
    fn kind(&self) -> UiFramework {
        UiFramework::Plain
    }

    fn is_available(&self) -> bool {
        true
    }

    fn select(&self, _items: &[MenuItem]) -> Result<Vec<String>, BackendError> {
        Ok(self.answer.iter().map(|s| s.to_string()).collect())
    }

    fn show_progress(&self, _current: usize, _total: usize, _label: &str) -> Result<(), BackendError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct StubRoutine {
    failing: Vec<&'static str>,
    visited: Rc<RefCell<Vec<String>>>,
}

impl InstallRoutine for StubRoutine {
    async fn install(&self, component: &Component) -> Result<(), InstallError> {
        self.visited.borrow_mut().push(component.id.to_string());
        if self.failing.contains(&component.id) {
            return Err(InstallError::Unsupported(component.id.to_string()));
        }
        Ok(())
    }
}

struct AbortPolicy;

impl RecoveryPolicy for AbortPolicy {
    fn on_failure(&self, _step: &str, _error: &str) -> RecoveryDecision {
        RecoveryDecision::Abort
    }
}

struct Fixture {
    _temp: TempDir,
    layout: Layout,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        fs::create_dir_all(&home).unwrap();
        fs::write(home.join(".bashrc"), "export EDITOR=vim\n").unwrap();
        let layout = Layout::with_home(&home, temp.path().join("run"));
        Self { _temp: temp, layout }
    }

    fn controller(
        &self,
        answer: Vec<&'static str>,
        routine: StubRoutine,
        options: RunOptions,
    ) -> InstallController<'static, StubRoutine> {
        let surface = InteractionSurface::new(
            Box::new(ScriptedBackend { answer }),
            Palette::new(Theme::Default),
        );
        InstallController::new(self.layout.clone(), CATALOG, surface, routine, options)
            .validator(Validator::with_search_path(self.layout.home(), "", None))
    }
}

fn options() -> RunOptions {
    RunOptions {
        spinner: false,
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn test_nothing_selected_exits_cleanly_without_backup() {
    let fixture = Fixture::new();
    let routine = StubRoutine::default();

    let outcome = fixture
        .controller(Vec::new(), routine.clone(), options())
        .run()
        .await;

    assert!(matches!(outcome, RunOutcome::NothingSelected));
    assert_eq!(outcome.exit_code(), 0);
    assert!(!fixture.layout.backup_dir().exists());
    assert!(routine.visited.borrow().is_empty());
}

#[tokio::test]
async fn test_interactive_run_backs_up_then_installs_in_order() {
    let fixture = Fixture::new();
    let routine = StubRoutine::default();

    let outcome = fixture
        .controller(vec!["rust", "mise", "essentials"], routine.clone(), options())
        .run()
        .await;

    assert_eq!(outcome.exit_code(), 0);
    let report = outcome.report().unwrap();

    let snapshot = report.backup.as_ref().unwrap();
    assert!(snapshot.path.join(".bashrc").exists());
    assert!(snapshot.path.starts_with(fixture.layout.backup_dir()));

    assert_eq!(*routine.visited.borrow(), vec!["essentials", "mise", "rust"]);
    assert_eq!(report.state.outcome_counts(), (3, 0, 0));

    // Nothing is on the empty search path, so every binary check fails
    let validation = report.validation.as_ref().unwrap();
    assert_eq!(validation.passed, 0);
    assert_eq!(validation.failed, 6);

    let progress = fs::read_to_string(fixture.layout.run_dir().join("progress")).unwrap();
    assert_eq!(progress.trim(), "3/3");
    let selected = fs::read_to_string(fixture.layout.run_dir().join("selected_components")).unwrap();
    assert_eq!(selected.lines().collect::<Vec<_>>(), vec!["essentials", "mise", "rust"]);
}

#[tokio::test]
async fn test_non_interactive_installs_defaults() {
    let fixture = Fixture::new();
    let routine = StubRoutine::default();
    let opts = RunOptions {
        non_interactive: true,
        skip_validation: true,
        ..options()
    };

    // The scripted answer is ignored without the menu
    let outcome = fixture.controller(vec!["fonts"], routine.clone(), opts).run().await;

    let report = outcome.report().unwrap();
    let expected = SelectionSet::defaults(CATALOG);
    assert_eq!(report.state.selected(), &expected);
    assert_eq!(routine.visited.borrow().len(), expected.len());
    // Package manager bootstrap comes before anything that uses it
    assert_eq!(routine.visited.borrow()[..2], ["homebrew", "essentials"]);
    assert!(report.validation.is_none());
}

#[tokio::test]
async fn test_partial_failure_still_exits_zero() {
    let fixture = Fixture::new();
    let routine = StubRoutine {
        failing: vec!["mise"],
        ..StubRoutine::default()
    };
    let opts = RunOptions {
        non_interactive: true,
        ..options()
    };

    let outcome = fixture
        .controller(Vec::new(), routine.clone(), opts)
        .run()
        .await;

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(outcome.exit_code(), 0);
    let state = &outcome.report().unwrap().state;
    assert!(state.errors_occurred());
    assert_eq!(state.outcome("mise"), Some(ComponentOutcome::Failed));
    assert_eq!(state.outcome("python"), Some(ComponentOutcome::Succeeded));
}

#[tokio::test]
async fn test_abort_after_failure_exits_one() {
    let fixture = Fixture::new();
    let routine = StubRoutine {
        failing: vec!["essentials"],
        ..StubRoutine::default()
    };

    let outcome = fixture
        .controller(vec!["essentials", "rust"], routine.clone(), options())
        .policy(Box::new(AbortPolicy))
        .run()
        .await;

    assert!(matches!(outcome, RunOutcome::Aborted(_)));
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(*routine.visited.borrow(), vec!["essentials"]);
    assert_eq!(
        outcome.report().unwrap().state.outcome("rust"),
        Some(ComponentOutcome::Skipped)
    );
}

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let fixture = Fixture::new();
    let routine = StubRoutine::default();
    let opts = RunOptions {
        dry_run: true,
        ..options()
    };

    let outcome = fixture
        .controller(vec!["rust", "zsh"], routine.clone(), opts)
        .run()
        .await;

    assert_eq!(outcome.exit_code(), 0);
    assert!(routine.visited.borrow().is_empty());
    assert!(!fixture.layout.backup_dir().exists());

    let report = outcome.report().unwrap();
    assert_eq!(report.state.outcome_counts(), (0, 0, 2));
    // Validation is read-only and still runs
    assert!(report.validation.is_some());
}

#[tokio::test]
async fn test_backup_failure_with_abort_installs_nothing() {
    let fixture = Fixture::new();
    // A file where ~/.devsetup should be blocks the backup root
    fs::write(fixture.layout.root(), "").unwrap();
    let routine = StubRoutine::default();

    let outcome = fixture
        .controller(vec!["rust"], routine.clone(), options())
        .policy(Box::new(AbortPolicy))
        .run()
        .await;

    assert_eq!(outcome.exit_code(), 1);
    assert!(routine.visited.borrow().is_empty());
    let state = &outcome.report().unwrap().state;
    assert!(state.errors_occurred());
    assert!(state.errors()[0].starts_with("backup:"));
}

#[tokio::test]
async fn test_backup_failure_with_continue_still_installs() {
    let fixture = Fixture::new();
    fs::write(fixture.layout.root(), "").unwrap();
    let routine = StubRoutine::default();
    let opts = RunOptions {
        non_interactive: true,
        ..options()
    };

    let outcome = fixture.controller(Vec::new(), routine.clone(), opts).run().await;

    assert_eq!(outcome.exit_code(), 0);
    let report = outcome.report().unwrap();
    assert!(report.backup.is_none());
    assert!(report.state.errors_occurred());
    assert!(!routine.visited.borrow().is_empty());
}

#[tokio::test]
async fn test_backup_can_be_disabled() {
    let fixture = Fixture::new();
    let opts = RunOptions {
        backup: false,
        ..options()
    };

    let outcome = fixture
        .controller(vec!["go"], StubRoutine::default(), opts)
        .run()
        .await;

    assert!(outcome.report().unwrap().backup.is_none());
    assert!(!fixture.layout.backup_dir().exists());
}

#[test]
fn test_restore_index_zero_is_out_of_range_even_when_interactive() {
    let fixture = Fixture::new();
    let manager = BackupManager::new(fixture.layout.home(), fixture.layout.backup_dir());
    manager.backup(&[".bashrc"]).unwrap();

    let err = choose_snapshot(&manager, Some(0), true).unwrap_err();
    assert!(matches!(err, BackupError::IndexOutOfRange { index: 0, available: 1 }));
}
