use chrono::Months;
use models::{BalanceRow, ForecastParameters, ForecastResult, GoalProgress, Series, Snapshot};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Current vs. previous row of the series.
///
/// With a single row the prior mapping is all zeros and the delta is 0.0,
/// there is no history to compare against.
pub fn snapshot(series: &Series) -> Snapshot {
    let last = series.last();
    let current = last.amounts.clone();
    let current_total = last.total();

    let (prior, prior_total, delta) = match series.previous() {
        Some(prev) => {
            let prior_total = prev.total();
            (prev.amounts.clone(), prior_total, current_total - prior_total)
        }
        None => {
            let zeros: BTreeMap<_, _> = current.keys().map(|c| (*c, 0.0)).collect();
            (zeros, 0.0, 0.0)
        }
    };

    Snapshot {
        period: last.period,
        current,
        prior,
        current_total,
        prior_total,
        delta,
    }
}

/// Extends the series with one synthetic row per forecast step.
///
/// Each step deposits the contribution into the contribution category and
/// then compounds every growth-bearing category by its rate for the step.
/// Other categories are carried forward unchanged. Periods are computed from
/// the last historical period so month-end dates do not drift.
pub fn project(series: &Series, params: &ForecastParameters) -> ForecastResult {
    let start = series.last();
    let current_total = start.total();
    let steps = params.steps();
    let months_per_step = params.granularity.months_per_step();
    let steps_per_year = f64::from(params.granularity.steps_per_year());
    let contribution = params.monthly_contribution * f64::from(months_per_step);

    debug!(
        steps,
        granularity = ?params.granularity,
        contribution,
        "projecting series from {}",
        start.period
    );

    let mut warnings = Vec::new();
    for (category, value) in start.amounts.iter().filter(|(_, v)| !v.is_finite()) {
        let msg = format!(
            "Non-finite amount {} for '{}' on {} propagates into the forecast",
            value, category, start.period
        );
        warn!("{}", msg);
        warnings.push(msg);
    }
    if !contribution.is_finite() {
        let msg = format!("Non-finite contribution {}", contribution);
        warn!("{}", msg);
        warnings.push(msg);
    }

    // The final period bounds every intermediate one
    let last_period = months_per_step
        .checked_mul(steps)
        .and_then(|m| start.period.checked_add_months(Months::new(m)));
    let steps = match last_period {
        Some(_) => steps,
        None => {
            let msg = format!(
                "Forecast horizon of {} steps from {} is beyond the supported date range, nothing projected",
                steps, start.period
            );
            warn!("{}", msg);
            warnings.push(msg);
            0
        }
    };

    let mut state = start.amounts.clone();
    state.entry(params.contribution_category).or_insert(0.0);

    // Per-step growth factors, looked up once
    let factors: BTreeMap<_, _> = state
        .keys()
        .filter_map(|c| {
            params
                .rates
                .rate_percent(*c)
                .map(|rate| (*c, 1.0 + rate / 100.0 / steps_per_year))
        })
        .collect();

    let mut rows = series.rows().to_vec();
    let mut projected = 0usize;

    for step in 1..=steps {
        let Some(period) = months_per_step
            .checked_mul(step)
            .and_then(|m| start.period.checked_add_months(Months::new(m)))
        else {
            break;
        };

        *state.entry(params.contribution_category).or_insert(0.0) += contribution;
        for (category, amount) in state.iter_mut() {
            if let Some(factor) = factors.get(category) {
                *amount *= factor;
            }
        }

        rows.push(BalanceRow {
            period,
            amounts: state.clone(),
        });
        projected += 1;
    }

    let forecasted_total = if projected > 0 {
        rows.last().map(BalanceRow::total).unwrap_or(current_total)
    } else {
        current_total
    };

    ForecastResult {
        granularity: params.granularity,
        series: rows,
        projected,
        current_total,
        forecasted_total,
        warnings,
    }
}

/// Progress towards a goal. A goal that is not positive has no ratio.
pub fn goal_progress(total: f64, goal: f64) -> GoalProgress {
    if goal > 0.0 {
        let diff = goal - total;
        GoalProgress {
            goal,
            total,
            ratio: Some(total / goal),
            // NaN stays NaN
            remaining: if diff < 0.0 { 0.0 } else { diff },
        }
    } else {
        GoalProgress {
            goal,
            total,
            ratio: None,
            remaining: 0.0,
        }
    }
}

pub fn meets_milestone(delta: f64, threshold: f64) -> bool {
    delta >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use models::{Category, GrowthRates, StepGranularity};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn scenario_series() -> Series {
        Series::new(vec![
            BalanceRow::new(date(2023, 1, 1))
                .with(Category::InvestmentAccount, 0.0)
                .with(Category::HouseDellach, 200000.0)
                .with(Category::BankAccount, 40000.0),
        ])
        .unwrap()
    }

    fn scenario_params() -> ForecastParameters {
        ForecastParameters {
            horizon_years: 1,
            granularity: StepGranularity::Annual,
            monthly_contribution: 1000.0,
            contribution_category: Category::InvestmentAccount,
            rates: GrowthRates {
                investment_account: 6.0,
                house_dellach: 2.0,
                savings_account: 0.0,
            },
        }
    }

    #[test]
    fn test_snapshot_single_row() {
        let snap = snapshot(&scenario_series());
        assert_eq!(snap.delta, 0.0);
        assert_eq!(snap.prior_total, 0.0);
        assert!(snap.prior.values().all(|v| *v == 0.0));
        assert_eq!(snap.prior.len(), 3);
        assert_eq!(snap.current_total, 240000.0);
    }

    #[test]
    fn test_snapshot_delta_and_milestone() {
        let series = Series::new(vec![
            BalanceRow::new(date(2023, 1, 1))
                .with(Category::BankAccount, 9500.0)
                .with(Category::InvestmentAccount, 40000.0),
            BalanceRow::new(date(2023, 1, 8))
                .with(Category::BankAccount, 10000.0)
                .with(Category::InvestmentAccount, 42000.0),
        ])
        .unwrap();
        let snap = snapshot(&series);
        assert_eq!(snap.current_total, 52000.0);
        assert_eq!(snap.prior_total, 49500.0);
        assert_eq!(snap.delta, 2500.0);
        assert!(meets_milestone(snap.delta, 2000.0));
        assert!(!meets_milestone(snap.delta, 3000.0));
    }

    #[test]
    fn test_snapshot_missing_category_in_prior() {
        let series = Series::new(vec![
            BalanceRow::new(date(2023, 1, 1)).with(Category::BankAccount, 100.0),
            BalanceRow::new(date(2023, 1, 8))
                .with(Category::BankAccount, 100.0)
                .with(Category::Others, 50.0),
        ])
        .unwrap();
        let snap = snapshot(&series);
        assert_eq!(snap.delta, 50.0);
        assert!(!snap.prior.contains_key(&Category::Others));
    }

    #[test]
    fn test_project_annual_scenario() {
        let result = project(&scenario_series(), &scenario_params());
        assert_eq!(result.projected, 1);
        assert_eq!(result.series.len(), 2);

        let row = &result.series[1];
        assert_eq!(row.period, date(2024, 1, 1));
        assert!(approx(row.amount(Category::InvestmentAccount), 12720.0));
        assert!(approx(row.amount(Category::HouseDellach), 204000.0));
        assert_eq!(row.amount(Category::BankAccount), 40000.0);
        assert!(approx(result.forecasted_total, 12720.0 + 204000.0 + 40000.0));
        assert_eq!(result.current_total, 240000.0);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_project_monthly_steps() {
        let mut params = scenario_params();
        params.granularity = StepGranularity::Monthly;
        params.horizon_years = 2;
        let result = project(&scenario_series(), &params);
        assert_eq!(result.projected, 24);
        assert_eq!(result.projection()[0].period, date(2023, 2, 1));
        assert_eq!(result.projection()[23].period, date(2025, 1, 1));

        // first month: (0 + 1000) * (1 + 0.06 / 12)
        assert!(approx(
            result.projection()[0].amount(Category::InvestmentAccount),
            1005.0
        ));
        // house grows by 2% / 12 per month
        let expected_house = 200000.0 * (1.0 + 0.02 / 12.0_f64).powi(24);
        assert!(approx(
            result.projection()[23].amount(Category::HouseDellach),
            expected_house
        ));
    }

    #[test]
    fn test_project_month_end_does_not_drift() {
        let series = Series::new(vec![
            BalanceRow::new(date(2023, 1, 31)).with(Category::BankAccount, 1.0),
        ])
        .unwrap();
        let params = ForecastParameters {
            horizon_years: 1,
            granularity: StepGranularity::Monthly,
            ..ForecastParameters::default()
        };
        let result = project(&series, &params);
        assert_eq!(result.projection()[0].period, date(2023, 2, 28));
        assert_eq!(result.projection()[2].period, date(2023, 4, 30));
        assert_eq!(result.projection()[11].period, date(2024, 1, 31));
    }

    #[test]
    fn test_project_zero_horizon_returns_input() {
        let series = scenario_series();
        let mut params = scenario_params();
        params.horizon_years = 0;
        let result = project(&series, &params);
        assert_eq!(result.projected, 0);
        assert_eq!(result.series, series.rows().to_vec());
        assert_eq!(result.forecasted_total, result.current_total);
        assert!(result.projection().is_empty());
        assert_eq!(result.history().len(), 1);
    }

    #[test]
    fn test_project_non_growth_categories_carry_forward() {
        let series = Series::new(vec![
            BalanceRow::new(date(2023, 1, 1))
                .with(Category::Inheritance, 30000.0)
                .with(Category::Others, 1200.0)
                .with(Category::SavingsAccount, 10000.0),
        ])
        .unwrap();
        let mut params = scenario_params();
        params.horizon_years = 3;
        params.rates.savings_account = 1.0;
        let result = project(&series, &params);
        let last = result.series.last().unwrap();
        assert_eq!(last.amount(Category::Inheritance), 30000.0);
        assert_eq!(last.amount(Category::Others), 1200.0);
        assert!(approx(
            last.amount(Category::SavingsAccount),
            10000.0 * 1.01_f64.powi(3)
        ));
        // contribution category is added even if absent in history
        assert!(last.amounts.contains_key(&Category::InvestmentAccount));
        assert!(!last.amounts.contains_key(&Category::HouseDellach));
    }

    #[test]
    fn test_project_contribution_into_non_growth_category() {
        let mut params = scenario_params();
        params.contribution_category = Category::BankAccount;
        let result = project(&scenario_series(), &params);
        let row = result.series.last().unwrap();
        assert_eq!(row.amount(Category::BankAccount), 52000.0);
        assert_eq!(row.amount(Category::InvestmentAccount), 0.0);
    }

    #[test]
    fn test_project_monotonic_in_contribution() {
        let series = scenario_series();
        let mut params = scenario_params();
        params.horizon_years = 5;
        let mut last_total = f64::MIN;
        for contribution in [0.0, 100.0, 250.0, 1000.0, 5000.0] {
            params.monthly_contribution = contribution;
            let total = project(&series, &params).forecasted_total;
            assert!(total > last_total);
            last_total = total;
        }
    }

    #[test]
    fn test_project_is_idempotent() {
        let series = scenario_series();
        let mut params = scenario_params();
        params.granularity = StepGranularity::Monthly;
        params.horizon_years = 10;
        let a = project(&series, &params);
        let b = project(&series, &params);
        assert_eq!(a, b);
        assert_eq!(
            a.forecasted_total.to_bits(),
            b.forecasted_total.to_bits()
        );
    }

    #[test]
    fn test_project_nan_propagates_with_warning() {
        let series = Series::new(vec![
            BalanceRow::new(date(2023, 1, 1))
                .with(Category::InvestmentAccount, f64::NAN)
                .with(Category::BankAccount, 100.0),
        ])
        .unwrap();
        let result = project(&series, &scenario_params());
        assert!(result.forecasted_total.is_nan());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Investment Account"));
    }

    #[test]
    fn test_project_horizon_beyond_date_range() {
        let series = scenario_series();
        for granularity in [StepGranularity::Annual, StepGranularity::Monthly] {
            for horizon_years in [400_000_000, u32::MAX] {
                let params = ForecastParameters {
                    horizon_years,
                    granularity,
                    ..scenario_params()
                };
                let result = project(&series, &params);
                assert_eq!(result.projected, 0);
                assert_eq!(result.series.len(), 1);
                assert_eq!(result.forecasted_total, result.current_total);
                assert_eq!(result.warnings.len(), 1);
                assert!(result.warnings[0].contains("date range"));
            }
        }
    }

    #[test]
    fn test_project_non_finite_contribution_warns() {
        let mut params = scenario_params();
        params.monthly_contribution = f64::INFINITY;
        let result = project(&scenario_series(), &params);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("contribution"));
    }

    #[test]
    fn test_goal_progress() {
        let progress = goal_progress(250000.0, 1000000.0);
        assert_eq!(progress.ratio, Some(0.25));
        assert_eq!(progress.remaining, 750000.0);

        let exceeded = goal_progress(1200000.0, 1000000.0);
        assert_eq!(exceeded.ratio, Some(1.2));
        assert_eq!(exceeded.remaining, 0.0);
    }

    #[test]
    fn test_goal_progress_invalid_goal() {
        for goal in [0.0, -10.0, f64::NAN] {
            let progress = goal_progress(5000.0, goal);
            assert_eq!(progress.ratio, None);
            assert_eq!(progress.remaining, 0.0);
        }
    }

    #[test]
    fn test_goal_progress_nan_total_is_not_hidden() {
        let progress = goal_progress(f64::NAN, 1000.0);
        assert!(progress.ratio.unwrap().is_nan());
        assert!(progress.remaining.is_nan());
    }
}
