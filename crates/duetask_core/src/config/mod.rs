use crate::display::DateStyle;
use crate::due::{HIGH_PRIORITY_DAYS, RETENTION_DAYS};
use crate::error::AppError;
use crate::scheduler::DEFAULT_CLEANUP_PERIOD;
use crate::storage::json_store;
use crate::store::{MAX_TASK_LENGTH, StorePolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "DUETASK_CONFIG_PATH";

/// Upper bounds keep every window representable as a `time::Duration` and a
/// tokio interval.
pub const MAX_WINDOW_DAYS: i64 = 36_500;
pub const MAX_CLEANUP_INTERVAL_HOURS: u64 = 24 * 365;

const RESET: &str = "\x1b[0m";

/// Colours for the list headings that stand out: high priority and completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Plain,
    Noir,
    Solarized,
}

impl Theme {
    pub fn parse(raw: &str) -> Option<Self> {
        match canonicalize_name(raw).as_str() {
            "" | "plain" | "default" => Some(Self::Plain),
            "noir" | "dark" => Some(Self::Noir),
            "solarized" => Some(Self::Solarized),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Noir => "noir",
            Self::Solarized => "solarized",
        }
    }

    pub fn high_priority(self, text: &str) -> String {
        match self {
            Self::Plain => paint(None, text),
            Self::Noir => paint(Some("\x1b[1;38;5;208m"), text),
            Self::Solarized => paint(Some("\x1b[38;5;166m"), text),
        }
    }

    pub fn completed(self, text: &str) -> String {
        match self {
            Self::Plain => paint(None, text),
            Self::Noir => paint(Some("\x1b[2m"), text),
            Self::Solarized => paint(Some("\x1b[38;5;245m"), text),
        }
    }
}

fn paint(code: Option<&str>, text: &str) -> String {
    match code {
        Some(code) => format!("{code}{text}{RESET}"),
        None => text.to_string(),
    }
}

/// Lowercases `raw` and collapses every run of non-alphanumerics into `_`.
pub fn canonicalize_name(raw: &str) -> String {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    cleaned.trim_matches('_').to_string()
}

fn default_high_priority_days() -> i64 {
    HIGH_PRIORITY_DAYS
}

fn default_retention_days() -> i64 {
    RETENTION_DAYS
}

fn default_max_task_length() -> usize {
    MAX_TASK_LENGTH
}

fn default_cleanup_interval_hours() -> u64 {
    DEFAULT_CLEANUP_PERIOD.as_secs() / 3600
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default = "default_high_priority_days")]
    pub high_priority_days: i64,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_max_task_length")]
    pub max_task_length: usize,
    #[serde(default = "default_cleanup_interval_hours")]
    pub cleanup_interval_hours: u64,
    #[serde(default)]
    pub date_style: Option<String>,
    #[serde(default)]
    pub desktop_alerts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: None,
            high_priority_days: HIGH_PRIORITY_DAYS,
            retention_days: RETENTION_DAYS,
            max_task_length: MAX_TASK_LENGTH,
            cleanup_interval_hours: default_cleanup_interval_hours(),
            date_style: None,
            desktop_alerts: false,
        }
    }
}

impl Config {
    pub fn policy(&self) -> StorePolicy {
        StorePolicy {
            max_task_length: self.max_task_length,
            high_priority_days: self.high_priority_days,
            retention_days: self.retention_days,
        }
    }

    pub fn cleanup_period(&self) -> Duration {
        let hours = self.cleanup_interval_hours.min(MAX_CLEANUP_INTERVAL_HOURS);
        Duration::from_secs(hours * 3600)
    }

    pub fn date_style(&self) -> DateStyle {
        self.date_style
            .as_deref()
            .and_then(|raw| DateStyle::parse(raw).ok())
            .unwrap_or_default()
    }

    pub fn theme(&self) -> Theme {
        self.theme
            .as_deref()
            .and_then(Theme::parse)
            .unwrap_or_default()
    }

    fn validate(&self) -> Result<(), AppError> {
        if !(0..=MAX_WINDOW_DAYS).contains(&self.high_priority_days) {
            return Err(AppError::invalid_data(format!(
                "high_priority_days must be between 0 and {MAX_WINDOW_DAYS}"
            )));
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&self.retention_days) {
            return Err(AppError::invalid_data(format!(
                "retention_days must be between 0 and {MAX_WINDOW_DAYS}"
            )));
        }
        if self.max_task_length == 0 {
            return Err(AppError::invalid_data("max_task_length must be at least 1"));
        }
        if !(1..=MAX_CLEANUP_INTERVAL_HOURS).contains(&self.cleanup_interval_hours) {
            return Err(AppError::invalid_data(format!(
                "cleanup_interval_hours must be between 1 and {MAX_CLEANUP_INTERVAL_HOURS}"
            )));
        }
        if let Some(theme) = self.theme.as_deref()
            && Theme::parse(theme).is_none()
        {
            return Err(AppError::invalid_data(format!("unknown theme '{theme}'")));
        }
        if let Some(style) = self.date_style.as_deref() {
            DateStyle::parse(style)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

/// Values given with `--config-override`, applied on top of the file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<String>,
    pub high_priority_days: Option<i64>,
    pub retention_days: Option<i64>,
    pub max_task_length: Option<usize>,
    pub cleanup_interval_hours: Option<u64>,
    pub date_style: Option<String>,
    pub desktop_alerts: Option<bool>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(json_store::app_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    config.validate()?;
    Ok(normalize_config_theme(config))
}

fn normalize_config_theme(mut config: Config) -> Config {
    config.theme = config
        .theme
        .as_deref()
        .and_then(Theme::parse)
        .map(|theme| theme.name().to_string());
    config
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Result<Config, AppError> {
    let mut merged = base.clone();
    if let Some(theme) = overrides.theme.as_ref() {
        merged.theme = Some(theme.clone());
    }
    if let Some(days) = overrides.high_priority_days {
        merged.high_priority_days = days;
    }
    if let Some(days) = overrides.retention_days {
        merged.retention_days = days;
    }
    if let Some(length) = overrides.max_task_length {
        merged.max_task_length = length;
    }
    if let Some(hours) = overrides.cleanup_interval_hours {
        merged.cleanup_interval_hours = hours;
    }
    if let Some(style) = overrides.date_style.as_ref() {
        merged.date_style = Some(style.clone());
    }
    if let Some(enabled) = overrides.desktop_alerts {
        merged.desktop_alerts = enabled;
    }

    merged.validate()?;
    Ok(normalize_config_theme(merged))
}
