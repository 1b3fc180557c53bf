use crate::logging::Verbosity;
use clap::Parser;

/// Set up a development environment: language toolchains, shell, fonts and
/// CLI tools, with a dotfile backup taken first.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "devsetup", version, about, long_about = None)]
pub struct Cli {
    /// Skip the menu and install the default components
    #[arg(short = 'y', long = "yes", visible_alias = "non-interactive")]
    pub yes: bool,

    /// Do not check for installed binaries afterwards
    #[arg(long)]
    pub skip_validation: bool,

    /// Show debug output on the console
    #[arg(short, long)]
    pub verbose: bool,

    /// Show what would be installed without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum verbosity
    #[arg(long)]
    pub debug: bool,

    /// Settings file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Do not back up dotfiles before installing
    #[arg(long)]
    pub no_backup: bool,

    /// Write a default settings file and exit
    #[arg(long, conflicts_with_all = ["list_backups", "restore"])]
    pub init_config: bool,

    /// List existing backups and exit
    #[arg(long, conflicts_with = "restore")]
    pub list_backups: bool,

    /// Restore a backup (1-based index from --list-backups) and exit
    #[arg(long, value_name = "INDEX", num_args = 0..=1)]
    pub restore: Option<Option<usize>>,
}

/// What the invocation asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install,
    InitConfig,
    ListBackups,
    /// `None` lets the user pick
    Restore(Option<usize>),
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.init_config {
            Action::InitConfig
        } else if self.list_backups {
            Action::ListBackups
        } else if let Some(index) = self.restore {
            Action::Restore(index)
        } else {
            Action::Install
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.debug)
    }
}
