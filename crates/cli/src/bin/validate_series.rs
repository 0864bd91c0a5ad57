use anyhow::{Result, anyhow};
use clap::Parser;
use std::path::PathBuf;

use cli::{init_tracing, validate_series_file};
use settings_loader::{
    DEFAULT_SETTINGS_FILE, load_default_settings, load_optional_settings, settings_file_exists,
};

#[derive(Debug, Parser)]
#[command(name = "validate-series", about = "Check a balance sheet export before forecasting")]
struct Args {
    /// CSV export of the balance sheet
    #[arg(short, long)]
    input: PathBuf,

    /// Optional forecast_settings.json to check as well
    #[arg(short, long)]
    settings: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    // Without --settings, check ./forecast_settings.json when present
    let settings = match load_optional_settings(args.settings.as_ref())? {
        Some(settings) => Some(settings),
        None if settings_file_exists(DEFAULT_SETTINGS_FILE) => Some(load_default_settings()?),
        None => None,
    };
    let report = validate_series_file(&args.input, settings.as_ref());
    let file_name = args
        .input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("series");
    report.print(file_name);

    if report.has_errors() {
        Err(anyhow!("Validation failed"))
    } else {
        println!("{} passed validation.", file_name);
        Ok(())
    }
}
