use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use cli::{Overrides, apply_overrides, init_tracing, parse_granularity, sheet_export_url};
use data_pipeline::load_series;
use forecast_engine::{
    JsonRenderer, Render, TableRenderer, generate_dashboard, write_dashboard, write_dashboard_json,
};
use models::StepGranularity;
use settings_loader::{load_settings_with_fallback, validate_settings};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Table,
    Json,
}

/// Projects the balance series forward and renders the dashboard.
#[derive(Debug, Parser)]
#[command(name = "forecast", author, version, about = "Net-worth forecast from a balance sheet export", long_about = None)]
struct Args {
    /// CSV export of the balance sheet
    #[arg(short, long)]
    input: PathBuf,

    /// Path to forecast_settings.json (falls back to ./forecast_settings.json, then defaults)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Write the rendered output here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Forecast horizon in years
    #[arg(long)]
    horizon: Option<u32>,

    /// annual or monthly steps
    #[arg(long, value_parser = parse_granularity)]
    granularity: Option<StepGranularity>,

    #[arg(long)]
    monthly_contribution: Option<f64>,

    #[arg(long)]
    goal: Option<f64>,

    /// Pretty-print JSON on stdout (JSON files are always pretty-printed)
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let settings = load_settings_with_fallback(args.settings.as_ref())?;
    let overrides = Overrides {
        horizon_years: args.horizon,
        granularity: args.granularity,
        monthly_contribution: args.monthly_contribution,
        goal: args.goal,
    };
    let settings = apply_overrides(settings, &overrides);
    validate_settings(&settings).context("Invalid forecast parameters")?;

    if let Some(url) = sheet_export_url(&settings) {
        tracing::info!("Sheet CSV export: {}", url);
    }

    let loaded = load_series(&args.input)?;
    let dashboard = generate_dashboard(&loaded.series, &settings);

    match (args.out, args.format) {
        (Some(path), Format::Json) => {
            write_dashboard_json(&dashboard, &path)?;
            tracing::info!("Wrote dashboard to {}", path.display());
        }
        (Some(path), Format::Table) => {
            write_dashboard(&dashboard, &TableRenderer, &path)?;
            tracing::info!("Wrote dashboard to {}", path.display());
        }
        (None, format) => {
            let renderer: Box<dyn Render> = match format {
                Format::Table => Box::new(TableRenderer),
                Format::Json => Box::new(JsonRenderer {
                    pretty: args.pretty,
                }),
            };
            let rendered = renderer.render(&dashboard).context("Rendering dashboard")?;
            println!("{}", rendered);
        }
    }
    Ok(())
}
