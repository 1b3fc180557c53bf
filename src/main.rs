//! devsetup - Development environment installer
//!
//! Main entry point for the command-line installer.
//!
//! # Execution Flow
//!
//! 1. Parse the command line (unknown flags exit 1, `--help` exits 0)
//! 2. Initialize logging → ~/.devsetup/logs/devsetup_<timestamp>.log
//! 3. Probe the host (unsupported OS exits 1)
//! 4. Load config/settings.toml (missing file exits 1)
//! 5. Select components, back up dotfiles, install in precedence order
//! 6. Validate the installed artifacts and print a summary
//!
//! Ctrl-C stops the run immediately (exit 130); nothing is rolled back.

use anyhow::{Context, Result, anyhow};
use camino::Utf8PathBuf;
use clap::Parser;
use clap::error::ErrorKind;
use devsetup::cli::{Action, Cli};
use devsetup::logging::{LogSession, setup_logging};
use devsetup::models::{ComponentOutcome, catalog};
use devsetup::paths::{self, Layout};
use devsetup::services::backup::BackupManager;
use devsetup::services::environment::{Environment, ProbeError};
use devsetup::services::installers::{ShellInstaller, font_dir};
use devsetup::services::validator::Validator;
use devsetup::ui::controller::choose_snapshot;
use devsetup::ui::{InstallController, InteractionSurface, Palette, RunOptions, RunOutcome};
use devsetup::{APP_NAME, ConfigManager, VERSION};
use std::process::ExitCode;

const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap exits 2 on usage errors; this installer reports 1
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let Some(layout) = Layout::discover() else {
        eprintln!("Error: {}", ProbeError::NoHomeDirectory);
        return ExitCode::FAILURE;
    };

    let session = match init_logging(&layout, &cli) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    match run(&cli, &layout, &session) {
        Ok(code) => {
            tracing::info!("Exiting with code {}", code);
            ExitCode::from(code)
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(layout: &Layout, cli: &Cli) -> Result<LogSession> {
    let log_dir = Utf8PathBuf::try_from(layout.log_dir()).context("Log directory is not valid UTF-8")?;
    setup_logging(&log_dir, APP_NAME, cli.verbosity())
}

fn run(cli: &Cli, layout: &Layout, session: &LogSession) -> Result<u8> {
    let config_manager = ConfigManager::new(paths::settings_path(cli.config.as_deref()));

    match cli.action() {
        Action::InitConfig => {
            config_manager.write_default_settings()?;
            println!("Wrote default settings to {}", config_manager.settings_path());
            Ok(0)
        }
        Action::ListBackups => {
            let manager = BackupManager::new(layout.home(), layout.backup_dir());
            let snapshots = manager.list_snapshots()?;
            if snapshots.is_empty() {
                println!("No backups in {}", manager.backup_root().display());
            }
            for (index, snapshot) in snapshots.iter().enumerate() {
                println!("{:>3}) {} ({} entries)", index + 1, snapshot.name, snapshot.entries.len());
            }
            Ok(0)
        }
        Action::Restore(index) => {
            let manager = BackupManager::new(layout.home(), layout.backup_dir());
            let snapshot = choose_snapshot(&manager, index, !cli.yes)?;
            let restored = manager.restore(&snapshot)?;
            println!("Restored {} entries from {}", restored, snapshot.name);
            Ok(0)
        }
        Action::Install => install(cli, layout, session, &config_manager),
    }
}

fn install(cli: &Cli, layout: &Layout, session: &LogSession, config_manager: &ConfigManager) -> Result<u8> {
    let env = Environment::probe()?;

    // Checked before anything is shown or installed
    let settings = config_manager.load_settings()?;
    session.apply_settings_level(settings.log_level)?;

    let palette = Palette::new(settings.theme);
    session.set_console_color(palette.uses_color())?;
    let ui = env.resolve_ui(settings.ui_framework);
    tracing::info!("Using {} for interaction", ui);

    let options = RunOptions {
        non_interactive: cli.yes,
        dry_run: cli.dry_run,
        skip_validation: cli.skip_validation,
        backup: settings.backup_enabled && !cli.no_backup,
        spinner: true,
    };

    let home = layout.home().to_path_buf();
    let validator = Validator::new(&home, font_dir(env.os, &home)).os(env.os);
    let installer = ShellInstaller::new(env, &home);
    let surface = InteractionSurface::for_framework(ui, palette);

    let controller =
        InstallController::new(layout.clone(), catalog(), surface, installer, options).validator(validator);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl-C handling unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let outcome = runtime.block_on(async {
        tokio::select! {
            outcome = controller.run() => Some(outcome),
            () = interrupted => None,
        }
    });

    let Some(outcome) = outcome else {
        tracing::warn!("Interrupted, stopping without rollback");
        return Ok(EXIT_INTERRUPTED);
    };

    print_summary(&outcome, &palette, session);
    u8::try_from(outcome.exit_code()).map_err(|_| anyhow!("Invalid exit code"))
}

fn print_summary(outcome: &RunOutcome, palette: &Palette, session: &LogSession) {
    let Some(report) = outcome.report() else {
        println!("Nothing selected.");
        return;
    };
    let state = &report.state;

    println!();
    println!("{}", palette.accent("Setup summary"));
    println!("  Components: {}", state.summary());
    for id in state.ids_with(ComponentOutcome::Failed) {
        println!("    {} {}", palette.warning("failed:"), id);
    }

    if let Some(snapshot) = &report.backup {
        println!("  Backup: {}", snapshot.path.display());
    }

    match &report.validation {
        Some(validation) if validation.is_clean() => {
            println!("  Validation: {} checks passed", validation.passed);
        }
        Some(validation) => {
            println!(
                "  Validation: {} passed, {} {}",
                validation.passed,
                validation.failed,
                palette.warning("failed")
            );
            println!("  Open a new shell if freshly installed tools are not on PATH yet.");
        }
        None => println!("  Validation: skipped"),
    }

    if let RunOutcome::Aborted(_) = outcome {
        println!("{}", palette.warning("Setup aborted."));
    }
    if state.errors_occurred() {
        println!("{} See the log: {}", palette.warning("Errors occurred."), session.path());
    } else {
        println!("{} Log: {}", palette.success("Completed without errors."), session.path());
    }
}
