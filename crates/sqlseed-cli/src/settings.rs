use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlseed_eval::{DEFAULT_MAX_ATTEMPTS, DEFAULT_MIN_PASS_RATE, RetryPolicy};
use sqlseed_generate::Dialect;
use thiserror::Error;

/// Settings file picked up from the working directory when `--config` is absent.
pub const DEFAULT_SETTINGS_FILE: &str = "sqlseed.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Defaults for `sqlseed generate`; every field can be overridden by a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dialect: Dialect,
    pub rows: usize,
    pub seed: u64,
    pub max_attempts: usize,
    pub min_pass_rate: f64,
    pub retry_delay_ms: u64,
    pub deadline_ms: Option<u64>,
    pub preserve_ids: bool,
    pub run_dir: PathBuf,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dialect: Dialect::Mysql,
            rows: 10,
            seed: 42,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_pass_rate: DEFAULT_MIN_PASS_RATE,
            retry_delay_ms: 100,
            deadline_ms: None,
            preserve_ids: false,
            run_dir: PathBuf::from("runs"),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.rows == 0 {
            return Err(SettingsError::Invalid("rows must be at least 1".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(SettingsError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.min_pass_rate) {
            return Err(SettingsError::Invalid(format!(
                "min_pass_rate must be within 0..=100, got {}",
                self.min_pass_rate
            )));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            min_pass_rate: self.min_pass_rate,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Load settings from `path`, or from `sqlseed.toml` in the working
/// directory when it exists. Missing default file means defaults.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_SETTINGS_FILE);
            if !fallback.exists() {
                return Ok(Settings::default());
            }
            fallback
        }
    };
    let content = std::fs::read_to_string(&path)?;
    parse_settings(&content)
}

pub fn parse_settings(content: &str) -> Result<Settings, SettingsError> {
    let settings: Settings = toml::from_str(content)?;
    settings.validate()?;
    Ok(settings)
}
