use std::path::Path;

use data_pipeline::{load_series, sheet_csv_export_url};
use models::{ForecastSettings, StepGranularity};
use settings_loader::validate_settings;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for the binaries; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "cli=info,forecast_engine=info,data_pipeline=info,settings_loader=info".into()
        }))
        .with_writer(std::io::stderr)
        .init();
}

/// Command-line values that take precedence over the settings file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub horizon_years: Option<u32>,
    pub granularity: Option<StepGranularity>,
    pub monthly_contribution: Option<f64>,
    pub goal: Option<f64>,
}

pub fn apply_overrides(mut settings: ForecastSettings, o: &Overrides) -> ForecastSettings {
    if let Some(h) = o.horizon_years {
        settings.horizon_years = h;
    }
    if let Some(g) = o.granularity {
        settings.granularity = g;
    }
    if let Some(c) = o.monthly_contribution {
        settings.monthly_contribution = c;
    }
    if let Some(goal) = o.goal {
        settings.goal = goal;
    }
    settings
}

pub fn parse_granularity(s: &str) -> Result<StepGranularity, String> {
    StepGranularity::from_str(s)
        .ok_or_else(|| format!("unknown granularity '{}', expected annual or monthly", s))
}

/// CSV export URL of the configured sheet, if any
pub fn sheet_export_url(settings: &ForecastSettings) -> Option<String> {
    settings
        .sheet_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(sheet_csv_export_url)
}

#[derive(Debug, Default)]
pub struct Report {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Report {
    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }
    fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }
    pub fn print(&self, file: &str) {
        for w in &self.warnings {
            println!("[WARN] {}: {}", file, w);
        }
        for e in &self.errors {
            println!("[ERROR] {}: {}", file, e);
        }
    }
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Checks a CSV export (and optionally the settings) before it feeds a forecast
pub fn validate_series_file(path: &Path, settings: Option<&ForecastSettings>) -> Report {
    let mut rep = Report::default();

    if let Some(settings) = settings {
        if let Err(e) = validate_settings(settings) {
            rep.error(format!("settings: {}", e));
        }
    }

    match load_series(path) {
        Ok(loaded) => {
            // Non-finite cells are reported as errors below
            for w in loaded
                .warnings
                .iter()
                .filter(|w| !w.starts_with("Non-finite"))
            {
                rep.warn(w.as_str());
            }
            for cell in loaded.series.non_finite_cells() {
                rep.error(format!(
                    "non-finite amount {} for '{}' on {}",
                    cell.value, cell.category, cell.period
                ));
            }
            if loaded.series.len() < 2 {
                rep.warn("only one row; period-over-period change will be 0");
            }
        }
        Err(e) => rep.error(format!("{:#}", e)),
    }
    rep
}
