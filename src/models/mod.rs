//! Data models for the installer.
//!
//! - [`Component`] / [`CATALOG`]: the static catalog of installable units
//! - [`SelectionSet`]: the subset of component ids chosen for a run
//! - [`RunState`]: progress, per-component results and the sticky error flag of one run
//! - [`Settings`]: installer settings loaded from `config/settings.toml`
//!
//! The catalog is immutable process-wide data. `RunState` is an explicit value
//! owned by whoever drives the run; nothing here is global or shared.

pub mod component;
pub mod config;
pub mod run_state;

pub use component::{CATALOG, Component, SelectionSet, catalog};
pub use config::{LogLevel, Settings, Theme, UiFramework, UnknownValue};
pub use run_state::{ComponentOutcome, RunState};
