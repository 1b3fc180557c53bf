// devsetup - Development environment installer
//
// This is the library crate containing the selection, backup, sequencing and
// validation logic. The binary crate (main.rs) provides the CLI entry point.

pub mod cli;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod paths;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{Component, ComponentOutcome, RunState, SelectionSet, Settings, catalog};
pub use paths::Layout;
pub use state::RunFiles;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
