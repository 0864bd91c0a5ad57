use anyhow::{Context, Result};
use comfy_table::Table;
use models::{Category, DashboardOutput};
use std::{collections::BTreeSet, fs, path::Path};

/// Presentation adapter for a generated dashboard
pub trait Render {
    fn render(&self, dashboard: &DashboardOutput) -> Result<String>;
}

pub struct JsonRenderer {
    pub pretty: bool,
}

impl Render for JsonRenderer {
    fn render(&self, dashboard: &DashboardOutput) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(dashboard)?
        } else {
            serde_json::to_string(dashboard)?
        };
        Ok(json)
    }
}

/// Plain-text tables: summary, categories, forecast rows
pub struct TableRenderer;

fn money(v: f64) -> String {
    format!("{:.2}", v)
}

impl TableRenderer {
    fn summary(dashboard: &DashboardOutput) -> Table {
        let s = &dashboard.summary;
        let progress = match s.goal_progress_ratio {
            Some(r) => format!("{:.2}%", r * 100.0),
            None => "n/a".to_string(),
        };
        let mut table = Table::new();
        table.set_header(vec!["Metric", "Value"]);
        table.add_row(vec!["Current total".to_string(), money(s.current_total)]);
        table.add_row(vec!["Prior total".to_string(), money(s.prior_total)]);
        table.add_row(vec!["Change".to_string(), money(s.delta)]);
        table.add_row(vec![
            "Forecasted total".to_string(),
            money(s.forecasted_total),
        ]);
        table.add_row(vec!["Goal".to_string(), money(dashboard.goal_progress.goal)]);
        table.add_row(vec!["Goal progress".to_string(), progress]);
        table.add_row(vec!["Remaining".to_string(), money(s.remaining_amount)]);
        table.add_row(vec![
            "Milestone reached".to_string(),
            (if dashboard.milestone_reached { "yes" } else { "no" }).to_string(),
        ]);
        table
    }

    fn categories(dashboard: &DashboardOutput) -> Table {
        let snap = &dashboard.snapshot;
        let mut table = Table::new();
        table.set_header(vec!["Category", "Current", "Prior", "Change"]);
        for (category, current) in &snap.current {
            let prior = snap.prior.get(category).copied().unwrap_or(0.0);
            table.add_row(vec![
                category.to_string(),
                money(*current),
                money(prior),
                money(current - prior),
            ]);
        }
        table
    }

    fn forecast(dashboard: &DashboardOutput) -> Table {
        let fc = &dashboard.forecast;
        let columns: BTreeSet<Category> = fc
            .series
            .iter()
            .flat_map(|row| row.amounts.keys().copied())
            .collect();

        let mut header = vec!["Period".to_string()];
        header.extend(columns.iter().map(|c| c.to_string()));
        header.push("Total".to_string());

        let mut table = Table::new();
        table.set_header(header);
        // Start row followed by the projected rows
        let start = fc.series.len() - fc.projected - 1;
        for row in &fc.series[start..] {
            let mut cells = vec![row.period.to_string()];
            cells.extend(columns.iter().map(|c| money(row.amount(*c))));
            cells.push(money(row.total()));
            table.add_row(cells);
        }
        table
    }
}

impl Render for TableRenderer {
    fn render(&self, dashboard: &DashboardOutput) -> Result<String> {
        let mut out = format!(
            "Net worth dashboard ({}), generated at {}\n\n",
            dashboard.metadata.currency, dashboard.metadata.generated_at
        );
        out.push_str(&format!(
            "Snapshot {}\n{}\n\n",
            dashboard.snapshot.period,
            Self::summary(dashboard)
        ));
        out.push_str(&format!("By category\n{}\n\n", Self::categories(dashboard)));
        out.push_str(&format!(
            "Forecast ({} {:?} steps)\n{}\n",
            dashboard.forecast.projected,
            dashboard.forecast.granularity,
            Self::forecast(dashboard)
        ));
        for w in &dashboard.forecast.warnings {
            out.push_str(&format!("[WARN] {}\n", w));
        }
        Ok(out)
    }
}

/// Renders the dashboard and writes it to `out_path`, creating missing parent dirs
pub fn write_dashboard(
    output: &DashboardOutput,
    renderer: &dyn Render,
    out_path: &Path,
) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating output dir: {}", parent.display()))?;
        }
    }
    let rendered = renderer.render(output).context("Rendering dashboard")?;
    fs::write(out_path, rendered)
        .with_context(|| format!("Writing output file: {}", out_path.display()))?;
    Ok(())
}

pub fn write_dashboard_json(output: &DashboardOutput, out_path: &Path) -> Result<()> {
    write_dashboard(output, &JsonRenderer { pretty: true }, out_path)
}
