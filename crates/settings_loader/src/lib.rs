//! # Settings Loader
//!
//! Loads the forecast configuration (`forecast_settings.json`) used by the
//! dashboard: horizon, step granularity, monthly contribution, per-category
//! interest rates, goal and milestone threshold.
//!
//! Every loaded file is validated against the same ranges the dashboard
//! sliders enforce, so the forecast core only ever sees sane parameters.
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! // Load settings from a specific path
//! let settings = settings_loader::load_settings("config/forecast_settings.json")?;
//!
//! // Explicit path, then default location, then built-in defaults
//! let path = Some(PathBuf::from("forecast_settings.json"));
//! let settings = settings_loader::load_settings_with_fallback(path.as_ref())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use models::ForecastSettings;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_SETTINGS_FILE: &str = "forecast_settings.json";
pub const MAX_HORIZON_YEARS: u32 = 100;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("Horizon of {0} years exceeds the maximum of 100")]
    HorizonTooLong(u32),

    #[error("Monthly contribution must be a finite non-negative amount, got {0}")]
    InvalidContribution(f64),

    #[error("Interest rate for {category} must be between 0 and 100 percent, got {value}")]
    InvalidRate { category: &'static str, value: f64 },

    #[error("Goal must be a finite amount, got {0}")]
    InvalidGoal(f64),

    #[error("Milestone threshold must be a finite amount, got {0}")]
    InvalidMilestone(f64),
}

/// Checks the parameter ranges. A non-positive goal is accepted; progress is then reported as undefined.
pub fn validate_settings(settings: &ForecastSettings) -> Result<(), SettingsError> {
    if settings.horizon_years > MAX_HORIZON_YEARS {
        return Err(SettingsError::HorizonTooLong(settings.horizon_years));
    }
    let c = settings.monthly_contribution;
    if !c.is_finite() || c < 0.0 {
        return Err(SettingsError::InvalidContribution(c));
    }
    let rates = [
        ("Investment Account", settings.rates.investment_account),
        ("House Dellach", settings.rates.house_dellach),
        ("Savings Account", settings.rates.savings_account),
    ];
    for (category, value) in rates {
        if !(0.0..=100.0).contains(&value) {
            return Err(SettingsError::InvalidRate { category, value });
        }
    }
    if !settings.goal.is_finite() {
        return Err(SettingsError::InvalidGoal(settings.goal));
    }
    if settings.goal <= 0.0 {
        warn!("Goal {} is not positive; goal progress will be undefined", settings.goal);
    }
    if !settings.milestone_threshold.is_finite() {
        return Err(SettingsError::InvalidMilestone(settings.milestone_threshold));
    }
    Ok(())
}

/// Loads and validates settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<ForecastSettings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: ForecastSettings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    validate_settings(&settings)
        .with_context(|| format!("Validating settings in {}", path.display()))?;
    debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Loads settings from the default location (forecast_settings.json in the current directory)
pub fn load_default_settings() -> Result<ForecastSettings> {
    load_settings(DEFAULT_SETTINGS_FILE)
}

/// Loads settings from an optional path, returning None if no path is provided
pub fn load_optional_settings(path: Option<&PathBuf>) -> Result<Option<ForecastSettings>> {
    match path {
        Some(settings_path) => Ok(Some(load_settings(settings_path)?)),
        None => Ok(None),
    }
}

/// Explicit path first, then the default file, then built-in defaults.
/// An explicit path that exists but is invalid is an error, not a fallback.
pub fn load_settings_with_fallback(path: Option<&PathBuf>) -> Result<ForecastSettings> {
    fallback_chain(path, Path::new(DEFAULT_SETTINGS_FILE))
}

fn fallback_chain(path: Option<&PathBuf>, default_file: &Path) -> Result<ForecastSettings> {
    if let Some(settings_path) = path {
        if settings_file_exists(settings_path) {
            return load_settings(settings_path);
        }
        warn!(
            "Settings file {} not found, falling back",
            settings_path.display()
        );
    }

    if settings_file_exists(default_file) {
        return load_settings(default_file);
    }
    debug!("No settings file found, using defaults");
    Ok(ForecastSettings::default())
}

/// Checks if a settings file exists at the given path
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}
