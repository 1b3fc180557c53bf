use crate::models::Settings;
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::fs;
use std::str::FromStr;
use thiserror::Error;

/// Prefix for environment variables that override settings keys
/// (e.g. `DEVSETUP_LOG_LEVEL=debug`).
pub const ENV_PREFIX: &str = "DEVSETUP";

/// Errors raised while loading or writing the settings file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Settings file not found: {0}")]
    NotFound(Utf8PathBuf),

    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings file already exists: {0}")]
    AlreadyExists(Utf8PathBuf),

    #[error("Failed to write settings file {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Configuration manager for the installer settings file.
///
/// The settings file is mandatory: a missing file is reported as
/// [`ConfigError::NotFound`]. Content that fails structured TOML parsing is
/// not fatal; known keys are then pulled out line by line and anything that
/// cannot be resolved keeps its default.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    settings_path: Utf8PathBuf,

    /// Matches `key = value` / `key: value` lines for the fallback scanner
    key_pattern: Regex,

    env_overrides: bool,
}

impl ConfigManager {
    /// Create a ConfigManager for the given settings file.
    ///
    /// # Arguments
    /// * `settings_path` - Path to the TOML settings file (e.g., "config/settings.toml")
    pub fn new<P: AsRef<Utf8Path>>(settings_path: P) -> Self {
        Self {
            settings_path: settings_path.as_ref().to_path_buf(),
            key_pattern: Regex::new(
                r#"(?m)^\s*([A-Za-z_][A-Za-z0-9_]*)\s*[=:]\s*["']?([^"'\s#]+)["']?"#,
            )
            .expect("Invalid settings key regex"),
            env_overrides: true,
        }
    }

    /// Ignore `DEVSETUP_*` environment overrides.
    pub fn without_env_overrides(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    /// Get the settings file path.
    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Load the settings file.
    ///
    /// # Returns
    /// The parsed settings, or the best-effort extraction when the file is not valid TOML
    ///
    /// # Errors
    /// [`ConfigError::NotFound`] when the file is missing, [`ConfigError::Read`] when it cannot be read
    pub fn load_settings(&self) -> Result<Settings, ConfigError> {
        if !self.settings_path.exists() {
            return Err(ConfigError::NotFound(self.settings_path.clone()));
        }

        let contents = fs::read_to_string(&self.settings_path).map_err(|source| ConfigError::Read {
            path: self.settings_path.clone(),
            source,
        })?;

        match self.parse_structured(&contents) {
            Ok(settings) => {
                tracing::info!("Loaded settings from {}", self.settings_path);
                Ok(settings)
            }
            Err(e) => {
                tracing::warn!(
                    "Could not parse {} as TOML ({}); falling back to key extraction",
                    self.settings_path,
                    e
                );
                Ok(self.extract_settings(&contents))
            }
        }
    }

    fn parse_structured(&self, contents: &str) -> Result<Settings, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml));

        if self.env_overrides {
            builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX));
        }

        builder.build()?.try_deserialize()
    }

    /// Best-effort extraction of known keys from unparseable content.
    ///
    /// Unknown keys are ignored and unknown values keep the built-in default.
    pub fn extract_settings(&self, contents: &str) -> Settings {
        let mut settings = Settings::default();

        for caps in self.key_pattern.captures_iter(contents) {
            let key = &caps[1];
            let value = &caps[2];

            match key {
                "ui_framework" => apply_value(&mut settings.ui_framework, key, value),
                "theme" => apply_value(&mut settings.theme, key, value),
                "log_level" => apply_value(&mut settings.log_level, key, value),
                "backup_enabled" => apply_value(&mut settings.backup_enabled, key, value),
                _ => tracing::debug!("Ignoring unknown settings key: {}", key),
            }
        }

        tracing::debug!("Extracted settings: {:?}", settings);
        settings
    }

    /// Save settings to the settings file, overwriting it.
    pub fn save_settings(&self, settings: &Settings) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(settings)?;

        if let Some(parent) = self.settings_path.parent() {
            if !parent.as_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                    path: self.settings_path.clone(),
                    source,
                })?;
            }
        }

        fs::write(&self.settings_path, toml_string).map_err(|source| ConfigError::Write {
            path: self.settings_path.clone(),
            source,
        })?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Write the default settings file. Refuses to overwrite an existing file.
    pub fn write_default_settings(&self) -> Result<(), ConfigError> {
        if self.settings_path.exists() {
            return Err(ConfigError::AlreadyExists(self.settings_path.clone()));
        }
        self.save_settings(&Settings::default())
    }
}

fn apply_value<T>(slot: &mut T, key: &str, value: &str)
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value.parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(e) => tracing::warn!("Keeping default for {}: {}", key, e),
    }
}
