use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// Balance categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Bank Account")]
    BankAccount,
    #[serde(rename = "Investment Account")]
    InvestmentAccount,
    #[serde(rename = "Inheritance")]
    Inheritance,
    #[serde(rename = "House Dellach")]
    HouseDellach,
    #[serde(rename = "Savings Account")]
    SavingsAccount,
    #[serde(rename = "Others")]
    Others,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::BankAccount,
        Category::InvestmentAccount,
        Category::Inheritance,
        Category::HouseDellach,
        Category::SavingsAccount,
        Category::Others,
    ];

    /// Parses a spreadsheet column header (case-insensitive, short aliases accepted)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bank account" | "bank" => Some(Category::BankAccount),
            "investment account" | "investment" | "investments" => {
                Some(Category::InvestmentAccount)
            }
            "inheritance" => Some(Category::Inheritance),
            "house dellach" | "house" => Some(Category::HouseDellach),
            "savings account" | "savings" => Some(Category::SavingsAccount),
            "others" | "other" => Some(Category::Others),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::BankAccount => "Bank Account",
            Category::InvestmentAccount => "Investment Account",
            Category::Inheritance => "Inheritance",
            Category::HouseDellach => "House Dellach",
            Category::SavingsAccount => "Savings Account",
            Category::Others => "Others",
        }
    }

    /// Growth-bearing categories accrue interest during a forecast
    pub fn is_growth_bearing(&self) -> bool {
        matches!(
            self,
            Category::InvestmentAccount | Category::HouseDellach | Category::SavingsAccount
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub period: NaiveDate,
    #[serde(flatten)]
    pub amounts: BTreeMap<Category, f64>,
}

impl BalanceRow {
    pub fn new(period: NaiveDate) -> Self {
        Self {
            period,
            amounts: BTreeMap::new(),
        }
    }

    pub fn with(mut self, category: Category, amount: f64) -> Self {
        self.amounts.insert(category, amount);
        self
    }

    /// Amount for a category; absent categories count as zero
    pub fn amount(&self, category: Category) -> f64 {
        self.amounts.get(&category).copied().unwrap_or(0.0)
    }

    /// Sum over the categories present in the row. Non-finite amounts propagate.
    pub fn total(&self) -> f64 {
        self.amounts.values().sum()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("Series has no rows")]
    Empty,

    #[error("Duplicate period in series: {0}")]
    DuplicatePeriod(NaiveDate),
}

/// A non-finite amount found in a series (NaN or infinite)
#[derive(Debug, Clone, PartialEq)]
pub struct NonFiniteCell {
    pub period: NaiveDate,
    pub category: Category,
    pub value: f64,
}

/// Rows ordered by period ascending, without duplicates, never empty
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    rows: Vec<BalanceRow>,
}

impl Series {
    pub fn new(mut rows: Vec<BalanceRow>) -> Result<Self, SeriesError> {
        if rows.is_empty() {
            return Err(SeriesError::Empty);
        }
        rows.sort_by_key(|r| r.period);
        if let Some(pair) = rows.windows(2).find(|w| w[0].period == w[1].period) {
            return Err(SeriesError::DuplicatePeriod(pair[1].period));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[BalanceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    // Always false, a Series cannot be constructed empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> &BalanceRow {
        &self.rows[self.rows.len() - 1]
    }

    /// Second-to-last row, if the series has at least two rows
    pub fn previous(&self) -> Option<&BalanceRow> {
        self.rows.len().checked_sub(2).map(|i| &self.rows[i])
    }

    pub fn non_finite_cells(&self) -> Vec<NonFiniteCell> {
        self.rows
            .iter()
            .flat_map(|row| {
                row.amounts
                    .iter()
                    .filter(|(_, v)| !v.is_finite())
                    .map(move |(c, v)| NonFiniteCell {
                        period: row.period,
                        category: *c,
                        value: *v,
                    })
            })
            .collect()
    }
}

// Forecast parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepGranularity {
    #[default]
    Annual,
    Monthly,
}

impl StepGranularity {
    pub fn steps_per_year(&self) -> u32 {
        match self {
            StepGranularity::Annual => 1,
            StepGranularity::Monthly => 12,
        }
    }

    pub fn months_per_step(&self) -> u32 {
        12 / self.steps_per_year()
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annual" | "yearly" | "year" => Some(StepGranularity::Annual),
            "monthly" | "month" => Some(StepGranularity::Monthly),
            _ => None,
        }
    }
}

/// Annual interest rates in percent for the growth-bearing categories
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthRates {
    pub investment_account: f64,
    pub house_dellach: f64,
    pub savings_account: f64,
}

impl Default for GrowthRates {
    fn default() -> Self {
        Self {
            investment_account: 6.0,
            house_dellach: 2.0,
            savings_account: 1.0,
        }
    }
}

impl GrowthRates {
    /// Rate in percent, None for categories that do not grow
    pub fn rate_percent(&self, category: Category) -> Option<f64> {
        match category {
            Category::InvestmentAccount => Some(self.investment_account),
            Category::HouseDellach => Some(self.house_dellach),
            Category::SavingsAccount => Some(self.savings_account),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastParameters {
    pub horizon_years: u32,
    pub granularity: StepGranularity,
    pub monthly_contribution: f64,
    pub contribution_category: Category,
    pub rates: GrowthRates,
}

impl Default for ForecastParameters {
    fn default() -> Self {
        ForecastSettings::default().parameters()
    }
}

impl ForecastParameters {
    /// Saturates at `u32::MAX`; the date range ends a forecast long before that
    pub fn steps(&self) -> u32 {
        self.horizon_years
            .saturating_mul(self.granularity.steps_per_year())
    }
}

// Settings models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub settings_version: u32,
    pub currency: String,
    pub sheet_url: Option<String>,
    pub horizon_years: u32,
    pub granularity: StepGranularity,
    pub monthly_contribution: f64,
    pub contribution_category: Category,
    pub rates: GrowthRates,
    pub goal: f64,
    pub milestone_threshold: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            settings_version: 1,
            currency: "EUR".to_string(),
            sheet_url: None,
            horizon_years: 10,
            granularity: StepGranularity::Annual,
            monthly_contribution: 500.0,
            contribution_category: Category::InvestmentAccount,
            rates: GrowthRates::default(),
            goal: 1_000_000.0,
            milestone_threshold: 2_000.0,
        }
    }
}

impl ForecastSettings {
    pub fn parameters(&self) -> ForecastParameters {
        ForecastParameters {
            horizon_years: self.horizon_years,
            granularity: self.granularity,
            monthly_contribution: self.monthly_contribution,
            contribution_category: self.contribution_category,
            rates: self.rates,
        }
    }
}

// Output models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub period: NaiveDate,
    pub current: BTreeMap<Category, f64>,
    pub prior: BTreeMap<Category, f64>,
    pub current_total: f64,
    pub prior_total: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub granularity: StepGranularity,
    pub series: Vec<BalanceRow>,
    /// Number of synthetic rows appended after the history
    pub projected: usize,
    pub current_total: f64,
    pub forecasted_total: f64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ForecastResult {
    pub fn history(&self) -> &[BalanceRow] {
        &self.series[..self.series.len() - self.projected]
    }

    pub fn projection(&self) -> &[BalanceRow] {
        &self.series[self.series.len() - self.projected..]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal: f64,
    pub total: f64,
    /// None when the goal is not positive
    pub ratio: Option<f64>,
    pub remaining: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardMetadata {
    pub generated_at: String,
    pub settings_version: u32,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub current_total: f64,
    pub prior_total: f64,
    pub delta: f64,
    pub forecasted_total: f64,
    pub goal_progress_ratio: Option<f64>,
    pub remaining_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardOutput {
    pub metadata: DashboardMetadata,
    pub summary: DashboardSummary,
    pub snapshot: Snapshot,
    pub forecast: ForecastResult,
    pub goal_progress: GoalProgress,
    pub milestone_reached: bool,
}
