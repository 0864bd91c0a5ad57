use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim};
use tracing::{debug, warn};

use models::{BalanceRow, Category, Series};

/// Header names recognized as the period column
const PERIOD_HEADERS: [&str; 3] = ["week", "date", "period"];

/// A validated series plus whatever the loader had to skip or flag
#[derive(Debug)]
pub struct LoadedSeries {
    pub series: Series,
    pub warnings: Vec<String>,
}

/// Rewrites a Google Sheets edit URL to its CSV export URL.
/// `.../edit#gid=0` -> `.../export?format=csv&gid=0`; other URLs are returned as-is.
pub fn sheet_csv_export_url(url: &str) -> String {
    url.replace("/edit#gid=", "/export?format=csv&gid=")
}

/// Parses date strings in the formats the sheet has used over time
pub fn parse_period(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .ok_or_else(|| anyhow!("Unrecognized date format: {}", s))
}

/// Normalizes a currency-formatted cell to a float.
/// Empty cells and placeholders (`-`, `--`) are `None`, the category is absent.
pub fn parse_amount(s: &str) -> Result<Option<f64>> {
    let s = s.trim();
    if s.is_empty() || s == "-" || s == "--" {
        return Ok(None);
    }

    // Remove currency symbols, codes, spaces and apostrophes (1'234.50)
    let mut cleaned: String = s
        .replace("EUR", "")
        .replace("USD", "")
        .chars()
        .filter(|c| !matches!(c, '€' | '$' | '£' | ' ' | '\u{a0}' | '\''))
        .collect();

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');
    match (last_comma, last_dot) {
        // Both present: the later one is the decimal separator
        (Some(c), Some(d)) if c > d => {
            cleaned = cleaned.replace('.', "").replace(',', ".");
        }
        (Some(_), Some(_)) => {
            cleaned = cleaned.replace(',', "");
        }
        // Only commas: a single comma with at most two digits after it is a decimal comma
        (Some(c), None) => {
            let decimals = cleaned.len() - c - 1;
            if cleaned.matches(',').count() == 1 && decimals <= 2 {
                cleaned = cleaned.replace(',', ".");
            } else {
                cleaned = cleaned.replace(',', "");
            }
        }
        (None, Some(_)) if cleaned.matches('.').count() > 1 => {
            cleaned = cleaned.replace('.', "");
        }
        _ => {}
    }

    cleaned
        .parse::<f64>()
        .map(Some)
        .with_context(|| format!("Failed to parse amount: {}", s))
}

/// Reads a CSV export of the balance sheet into a series.
///
/// The period column is the first header named week/date/period, or column 0.
/// Every other header must name a category; unknown columns are skipped with a warning.
pub fn load_series_from_reader<R: Read>(reader: R) -> Result<LoadedSeries> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers().context("Reading CSV header")?.clone();
    let period_col = headers
        .iter()
        .position(|h| PERIOD_HEADERS.contains(&h.to_ascii_lowercase().as_str()))
        .unwrap_or(0);

    let mut warnings = Vec::new();
    let mut columns: Vec<(usize, Category)> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if idx == period_col {
            continue;
        }
        match Category::from_str(header) {
            Some(cat) if columns.iter().any(|(_, c)| *c == cat) => {
                warnings.push(format!("Duplicate column '{}' for {}, skipped", header, cat));
            }
            Some(cat) => columns.push((idx, cat)),
            None => warnings.push(format!("Unknown column '{}', skipped", header)),
        }
    }

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Reading CSV record {}", idx + 1))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(idx as u64 + 2);

        let period = parse_period(record.get(period_col).unwrap_or(""))
            .with_context(|| format!("Line {}: invalid period", line))?;
        let mut row = BalanceRow::new(period);
        for (col, cat) in &columns {
            let cell = record.get(*col).unwrap_or("");
            let Some(amount) =
                parse_amount(cell).with_context(|| format!("Line {}, column '{}'", line, cat))?
            else {
                continue;
            };
            if !amount.is_finite() {
                warnings.push(format!(
                    "Non-finite amount '{}' for '{}' on {}",
                    cell.trim(),
                    cat,
                    period
                ));
            } else if amount < 0.0 {
                warnings.push(format!(
                    "Negative amount {} for '{}' on {}",
                    amount, cat, period
                ));
            }
            row.amounts.insert(*cat, amount);
        }
        rows.push(row);
    }

    for w in &warnings {
        warn!("{}", w);
    }
    let series = Series::new(rows).context("Building series from CSV")?;
    debug!(
        rows = series.len(),
        categories = columns.len(),
        "Loaded balance series"
    );
    Ok(LoadedSeries { series, warnings })
}

/// Loads a CSV export from disk
pub fn load_series<P: AsRef<Path>>(path: P) -> Result<LoadedSeries> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Opening {}", path.display()))?;
    load_series_from_reader(file).with_context(|| format!("Loading series from {}", path.display()))
}
