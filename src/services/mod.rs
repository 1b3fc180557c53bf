//! Services module - the installer's business logic.
//!
//! Nothing here renders UI or reads the command line. Each service takes its
//! inputs explicitly so it can be driven from tests with a scratch home
//! directory and stand-in install routines.
//!
//! # Components
//!
//! - [`environment`]: host detection (OS, distro, package manager, UI toolkits)
//! - [`backup`]: dotfile snapshots and restore
//! - [`sequencer`]: ordered installation with per-component outcomes
//! - [`installers`]: the shell-backed install routine for each component
//! - [`validator`]: post-install artifact checks
//!
//! # Usage Example
//!
//! ```ignore
//! use devsetup::services::{Sequencer, ShellInstaller};
//!
//! let installer = ShellInstaller::new(env, home);
//! let state = Sequencer::new()
//!     .run(selection, catalog(), &installer, &surface, &policy)
//!     .await;
//! ```

pub mod backup;
pub mod environment;
pub mod installers;
pub mod sequencer;
pub mod validator;

pub use backup::{BackupError, BackupManager, BackupSnapshot};
pub use environment::{Distro, Environment, OsKind, PackageManager, ProbeError};
pub use installers::{InstallError, InstallRoutine, Recipe, ShellInstaller};
pub use sequencer::{ProgressSink, RecoveryDecision, RecoveryPolicy, Sequencer, plan};
pub use validator::{Artifact, ValidationReport, Validator};
