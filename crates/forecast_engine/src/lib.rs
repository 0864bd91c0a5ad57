pub mod projection;
pub mod render;

use chrono::Local;
use models::{
    BalanceRow, Category, DashboardMetadata, DashboardOutput, DashboardSummary, ForecastSettings,
    Series,
};
use std::collections::BTreeMap;
use tracing::info;

pub use projection::{goal_progress, meets_milestone, project, snapshot};
pub use render::{JsonRenderer, Render, TableRenderer, write_dashboard, write_dashboard_json};

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}

fn round_amounts(map: &mut BTreeMap<Category, f64>) {
    for v in map.values_mut() {
        *v = round2(*v);
    }
}

/// Rounds monetary values to 2 decimals and ratios to 4 decimals for output
fn finalize(mut out: DashboardOutput) -> DashboardOutput {
    let s = &mut out.summary;
    s.current_total = round2(s.current_total);
    s.prior_total = round2(s.prior_total);
    s.delta = round2(s.delta);
    s.forecasted_total = round2(s.forecasted_total);
    s.goal_progress_ratio = s.goal_progress_ratio.map(round4);
    s.remaining_amount = round2(s.remaining_amount);

    let snap = &mut out.snapshot;
    round_amounts(&mut snap.current);
    round_amounts(&mut snap.prior);
    snap.current_total = round2(snap.current_total);
    snap.prior_total = round2(snap.prior_total);
    snap.delta = round2(snap.delta);

    let fc = &mut out.forecast;
    fc.current_total = round2(fc.current_total);
    fc.forecasted_total = round2(fc.forecasted_total);
    for BalanceRow { amounts, .. } in fc.series.iter_mut() {
        round_amounts(amounts);
    }

    let gp = &mut out.goal_progress;
    gp.total = round2(gp.total);
    gp.ratio = gp.ratio.map(round4);
    gp.remaining = round2(gp.remaining);
    out
}

/// Runs snapshot, projection, goal progress and milestone check for one render
pub fn generate_dashboard(series: &Series, settings: &ForecastSettings) -> DashboardOutput {
    let snap = snapshot(series);
    let forecast = project(series, &settings.parameters());
    let progress = goal_progress(forecast.forecasted_total, settings.goal);
    let milestone_reached = meets_milestone(snap.delta, settings.milestone_threshold);

    info!(
        rows = series.len(),
        projected = forecast.projected,
        current_total = snap.current_total,
        forecasted_total = forecast.forecasted_total,
        "dashboard generated"
    );

    let summary = DashboardSummary {
        current_total: snap.current_total,
        prior_total: snap.prior_total,
        delta: snap.delta,
        forecasted_total: forecast.forecasted_total,
        goal_progress_ratio: progress.ratio,
        remaining_amount: progress.remaining,
    };
    let metadata = DashboardMetadata {
        generated_at: Local::now().to_rfc3339(),
        settings_version: settings.settings_version,
        currency: settings.currency.clone(),
    };

    finalize(DashboardOutput {
        metadata,
        summary,
        snapshot: snap,
        forecast,
        goal_progress: progress,
        milestone_reached,
    })
}
