//! Per-account aggregation and the composite alpha score.
//!
//! Every metric column is standardized across the accounts of one window, with
//! missing values replaced by the column mean so they score exactly zero. The
//! alpha score is the plain mean of the six standardized components.

use std::collections::{BTreeMap, HashMap};

use chrono::{Days, NaiveDate};
use common::types::{LeaderboardRow, Outcome, SignalRecord};

const SHARPE_EPSILON: f64 = 1e-9;
const Z_EPSILON: f64 = 1e-12;

/// Outcome metrics for one joined (signal, outcome) row. A signal without
/// outcomes contributes one row with every metric missing.
#[derive(Debug, Clone, Copy, Default)]
struct JoinedRow {
    won: Option<f64>,
    excess_return: Option<f64>,
    brier: Option<f64>,
    clv_points: Option<f64>,
    pnl_per_contract: Option<f64>,
}

impl From<&Outcome> for JoinedRow {
    fn from(o: &Outcome) -> Self {
        Self {
            won: o.won.map(|w| if w { 1.0 } else { 0.0 }),
            excess_return: finite(o.excess_return),
            brier: finite(o.brier),
            clv_points: finite(o.clv_points),
            pnl_per_contract: finite(o.pnl_per_contract),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AccountMetrics {
    n_signals: u32,
    win_rate: Option<f64>,
    mean_excess_return: Option<f64>,
    sharpe_like: Option<f64>,
    mean_brier: Option<f64>,
    mean_clv_points: Option<f64>,
    mean_pred_pnl: Option<f64>,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn population_std(values: &[f64], center: f64) -> f64 {
    let var = values.iter().map(|v| (v - center).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

fn mean_of(rows: &[JoinedRow], field: impl Fn(&JoinedRow) -> Option<f64>) -> Option<f64> {
    let values: Vec<f64> = rows.iter().filter_map(field).collect();
    mean(&values)
}

fn aggregate(rows: &[JoinedRow]) -> AccountMetrics {
    let excess: Vec<f64> = rows.iter().filter_map(|r| r.excess_return).collect();
    let sharpe_like = mean(&excess).map(|m| m / (population_std(&excess, m) + SHARPE_EPSILON));
    AccountMetrics {
        n_signals: u32::try_from(rows.len()).unwrap_or(u32::MAX),
        win_rate: mean_of(rows, |r| r.won),
        mean_excess_return: mean(&excess),
        sharpe_like,
        mean_brier: mean_of(rows, |r| r.brier),
        mean_clv_points: mean_of(rows, |r| r.clv_points),
        mean_pred_pnl: mean_of(rows, |r| r.pnl_per_contract),
    }
}

/// Population z-scores with missing entries filled by the column mean.
/// A column with no values, or no spread, scores zero everywhere.
pub fn zscores(column: &[Option<f64>]) -> Vec<f64> {
    let present: Vec<f64> = column.iter().flatten().copied().collect();
    let Some(center) = mean(&present) else {
        return vec![0.0; column.len()];
    };
    let filled: Vec<f64> = column.iter().map(|v| v.unwrap_or(center)).collect();
    let std = population_std(&filled, center);
    if std == 0.0 {
        return vec![0.0; column.len()];
    }
    filled.iter().map(|v| (v - center) / (std + Z_EPSILON)).collect()
}

/// Leaderboard for one trailing window ending on `as_of` (inclusive).
pub fn build_leaderboard(
    records: &[SignalRecord],
    outcomes: &[Outcome],
    window_days: u32,
    as_of: NaiveDate,
) -> Vec<LeaderboardRow> {
    let start_date = as_of
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MIN);

    let mut by_signal: HashMap<i64, Vec<&Outcome>> = HashMap::new();
    for outcome in outcomes {
        by_signal.entry(outcome.signal_id).or_default().push(outcome);
    }
    for rows in by_signal.values_mut() {
        rows.sort_by(|a, b| a.evaluation_window.cmp(&b.evaluation_window));
    }

    // Accounts and their signals in a fixed order, so sums do not depend on input order.
    let mut signals_by_account: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for record in records {
        let posted = record.posted_at.date_naive();
        if posted >= start_date && posted <= as_of {
            signals_by_account
                .entry(record.account_id)
                .or_default()
                .push(record.id);
        }
    }

    let accounts: Vec<(i64, AccountMetrics)> = signals_by_account
        .into_iter()
        .map(|(account_id, mut signal_ids)| {
            signal_ids.sort_unstable();
            let joined: Vec<JoinedRow> = signal_ids
                .iter()
                .flat_map(|id| match by_signal.get(id) {
                    Some(rows) => rows.iter().map(|o| JoinedRow::from(*o)).collect::<Vec<_>>(),
                    None => vec![JoinedRow::default()],
                })
                .collect();
            (account_id, aggregate(&joined))
        })
        .collect();

    let column = |field: fn(&AccountMetrics) -> Option<f64>| -> Vec<f64> {
        zscores(&accounts.iter().map(|(_, m)| field(m)).collect::<Vec<_>>())
    };
    let components = [
        column(|m| m.win_rate),
        column(|m| m.mean_excess_return),
        column(|m| m.sharpe_like),
        column(|m| m.mean_clv_points),
        column(|m| m.mean_pred_pnl),
        column(|m| m.mean_brier.map(|b| -b)),
    ];

    let mut rows: Vec<LeaderboardRow> = accounts
        .iter()
        .enumerate()
        .map(|(i, (account_id, m))| {
            let alpha_score =
                components.iter().map(|z| z[i]).sum::<f64>() / components.len() as f64;
            LeaderboardRow {
                account_id: *account_id,
                window_days,
                start_date,
                end_date: as_of,
                n_signals: m.n_signals,
                win_rate: m.win_rate,
                mean_excess_return: m.mean_excess_return,
                sharpe_like: m.sharpe_like,
                mean_brier: m.mean_brier,
                mean_clv_points: m.mean_clv_points,
                mean_pred_pnl: m.mean_pred_pnl,
                alpha_score,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.alpha_score
            .partial_cmp(&a.alpha_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.account_id.cmp(&b.account_id))
    });
    rows
}

/// One slice per configured window; the union replaces the stored table.
pub fn build_all_windows(
    records: &[SignalRecord],
    outcomes: &[Outcome],
    windows_days: &[u32],
    as_of: NaiveDate,
) -> Vec<LeaderboardRow> {
    windows_days
        .iter()
        .flat_map(|days| {
            let rows = build_leaderboard(records, outcomes, *days, as_of);
            tracing::debug!(window_days = *days, accounts = rows.len(), "leaderboard window built");
            rows
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::types::{AssetClass, EvaluationWindow, ParsedSignal, Side};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    fn record(id: i64, account_id: i64, day: u32) -> SignalRecord {
        SignalRecord {
            id,
            account_id,
            posted_at: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            signal: ParsedSignal::new(AssetClass::Equity, Side::Long),
        }
    }

    fn outcome(signal_id: i64, excess: f64, won: Option<bool>) -> Outcome {
        let mut o = Outcome::new(
            signal_id,
            EvaluationWindow::Horizon("1d".to_string()),
            Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap(),
        );
        o.excess_return = Some(excess);
        o.won = won;
        o
    }

    fn population() -> (Vec<SignalRecord>, Vec<Outcome>) {
        let records = vec![
            record(1, 10, 5),
            record(2, 10, 6),
            record(3, 20, 7),
            record(4, 30, 8),
            record(5, 40, 9),
        ];
        let mut prediction = outcome(4, 0.0, Some(true));
        prediction.excess_return = None;
        prediction.brier = Some(0.04);
        prediction.pnl_per_contract = Some(0.6);
        let outcomes = vec![
            outcome(1, 0.05, None),
            outcome(2, 0.01, None),
            outcome(3, -0.02, Some(false)),
            prediction,
        ];
        (records, outcomes)
    }

    #[test]
    fn test_alpha_is_invariant_to_input_order() {
        let (mut records, mut outcomes) = population();
        let expected = build_leaderboard(&records, &outcomes, 90, as_of());

        records.reverse();
        outcomes.rotate_left(2);
        let permuted = build_leaderboard(&records, &outcomes, 90, as_of());
        assert_eq!(expected, permuted);
    }

    #[test]
    fn test_account_without_outcomes_scores_zero() {
        let (records, outcomes) = population();
        let rows = build_leaderboard(&records, &outcomes, 90, as_of());
        let silent = rows.iter().find(|r| r.account_id == 40).unwrap();

        assert_eq!(silent.n_signals, 1);
        assert_eq!(silent.win_rate, None);
        assert_eq!(silent.mean_excess_return, None);
        assert_eq!(silent.sharpe_like, None);
        assert_eq!(silent.alpha_score, 0.0);
        assert!(rows.iter().all(|r| r.alpha_score.is_finite()));
    }

    #[test]
    fn test_aggregates_and_ordering() {
        let (records, outcomes) = population();
        let rows = build_leaderboard(&records, &outcomes, 90, as_of());
        assert_eq!(rows.len(), 4);
        assert!(rows.windows(2).all(|w| w[0].alpha_score >= w[1].alpha_score));

        let first = rows.iter().find(|r| r.account_id == 10).unwrap();
        assert_eq!(first.n_signals, 2);
        assert!((first.mean_excess_return.unwrap() - 0.03).abs() < 1e-12);
        // mean 0.03, population std 0.02
        assert!((first.sharpe_like.unwrap() - 1.5).abs() < 1e-6);
        assert_eq!(first.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(first.end_date, as_of());
    }

    #[test]
    fn test_window_excludes_older_posts() {
        let (mut records, outcomes) = population();
        records.push(SignalRecord {
            posted_at: Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap(),
            ..record(6, 50, 1)
        });
        let rows = build_leaderboard(&records, &outcomes, 7, as_of());
        assert!(rows.is_empty());

        let rows = build_all_windows(&records, &outcomes, &[30, 365], as_of());
        assert_eq!(rows.iter().filter(|r| r.window_days == 30).count(), 4);
        assert_eq!(rows.iter().filter(|r| r.window_days == 365).count(), 5);
    }

    #[test]
    fn test_zscores_fill_and_flat_columns() {
        let z = zscores(&[Some(1.0), None, Some(3.0)]);
        assert_eq!(z[1], 0.0);
        assert!(z[0] < 0.0 && z[2] > 0.0);
        assert_eq!(zscores(&[Some(2.0), Some(2.0)]), vec![0.0, 0.0]);
        assert_eq!(zscores(&[None, None]), vec![0.0, 0.0]);
    }
}
