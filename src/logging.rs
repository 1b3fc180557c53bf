use crate::models::LogLevel;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{
    self, MakeWriter,
    format::{DefaultFields, Format, Full},
};
use tracing_subscriber::{EnvFilter, Layer, Registry, layer::SubscriberExt, reload, util::SubscriberInitExt};

/// Verbosity requested on the command line.
///
/// Takes precedence over the settings file's `log_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Use the settings file
    #[default]
    Normal,
    /// `--verbose`
    Verbose,
    /// `--debug`
    Debug,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        if debug {
            Verbosity::Debug
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Filter directive forced by the CLI, if any
    pub fn directive(&self) -> Option<&'static str> {
        match self {
            Verbosity::Normal => None,
            Verbosity::Verbose => Some("debug"),
            Verbosity::Debug => Some("trace"),
        }
    }

    /// Threshold for the console layer. Warnings and errors always reach the console.
    pub fn console_level(&self) -> LevelFilter {
        match self {
            Verbosity::Normal => LevelFilter::WARN,
            Verbosity::Verbose => LevelFilter::DEBUG,
            Verbosity::Debug => LevelFilter::TRACE,
        }
    }
}

/// Active logging for one run.
///
/// The guard must be held for the duration of the program to keep the file writer flushing.
pub struct LogSession {
    _guard: WorkerGuard,
    path: Utf8PathBuf,
    verbosity: Verbosity,
    filter: reload::Handle<EnvFilter, Registry>,
    console_ansi: Box<dyn Fn(bool) -> Result<()> + Send + Sync>,
}

impl LogSession {
    /// Path of this run's log file
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Apply the settings file's level unless the CLI already forced one.
    pub fn apply_settings_level(&self, level: LogLevel) -> Result<()> {
        if self.verbosity.directive().is_some() {
            tracing::debug!("Log level forced by command line; ignoring settings level {:?}", level);
            return Ok(());
        }

        self.filter
            .modify(|filter| *filter = EnvFilter::new(level.as_directive()))
            .context("Failed to update log filter")?;

        tracing::debug!("Log level set to {}", level.as_directive());
        Ok(())
    }

    /// Turn colour in console log lines on or off, e.g. for the `mono` theme.
    /// The log file never carries colour.
    pub fn set_console_color(&self, enabled: bool) -> Result<()> {
        (self.console_ansi)(enabled)
    }
}

type ConsoleWriter = fn() -> std::io::Stderr;

/// Console formatter. Rebuilt through a reload handle when colour changes.
fn console_fmt_layer<S, W>(writer: W, ansi: bool) -> fmt::Layer<S, DefaultFields, Format<Full, ()>, W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .without_time()
}

/// File name for a run log, e.g. `devsetup_20261018_091500.log`.
pub fn log_file_name(prefix: &str, started: DateTime<Local>) -> String {
    format!("{}_{}.log", prefix, started.format("%Y%m%d_%H%M%S"))
}

/// Setup logging with a per-run log file and console output.
///
/// Every event at or above the active level goes to the file; the console
/// shows warnings and errors (more with `--verbose`/`--debug`) so that errors
/// are always duplicated to both.
///
/// # Arguments
/// * `log_dir` - Directory for log files (e.g., "~/.devsetup/logs")
/// * `log_prefix` - Prefix for log files (e.g., "devsetup")
/// * `verbosity` - Verbosity from the command line
///
/// # Returns
/// A [`LogSession`] that must be held for the duration of the program
pub fn setup_logging(log_dir: &Utf8Path, log_prefix: &str, verbosity: Verbosity) -> Result<LogSession> {
    // Create log directory if it doesn't exist
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }

    let file_name = log_file_name(log_prefix, Local::now());
    let path = log_dir.join(&file_name);

    let file_appender = rolling::never(log_dir, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Settings are not loaded yet; start at info unless the CLI forced a level
    let (filter, handle) = reload::Layer::new(EnvFilter::new(verbosity.directive().unwrap_or("info")));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let (console_fmt, console_handle) =
        reload::Layer::new(console_fmt_layer(std::io::stderr as ConsoleWriter, true));
    let console_layer = console_fmt.with_filter(verbosity.console_level());

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "Logging initialized: file={}, verbosity={:?}",
        path,
        verbosity
    );

    let console_ansi = move |ansi: bool| {
        console_handle
            .modify(|layer| *layer = console_fmt_layer(std::io::stderr as ConsoleWriter, ansi))
            .context("Failed to update console log colour")
    };

    Ok(LogSession {
        _guard: guard,
        path,
        verbosity,
        filter: handle,
        console_ansi: Box::new(console_ansi),
    })
}
