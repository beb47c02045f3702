use chrono::Duration;
use common::types::{AssetClass, EvaluationWindow, Outcome, PriceBar, Side, SignalRecord};

use super::series::{index_series, TimeSeries};
use super::{exclude, OutcomeSettings, BRANCH_PRICE};

/// Simple return, sign-flipped for shorts.
pub fn realized_return(entry: f64, exit: f64, side: Side) -> f64 {
    let ret = (exit - entry) / entry;
    match side {
        Side::Short => -ret,
        _ => ret,
    }
}

/// One outcome per resolvable horizon for every equity and crypto signal.
pub fn compute(
    records: &[SignalRecord],
    prices: &[PriceBar],
    settings: &OutcomeSettings,
) -> Vec<Outcome> {
    let index = index_series(
        prices
            .iter()
            .map(|bar| (bar.instrument.as_str(), bar.ts, bar.price)),
    );
    let empty = TimeSeries::default();

    let mut outcomes = Vec::new();
    for record in records {
        let signal = &record.signal;
        if !matches!(signal.asset_class, AssetClass::Equity | AssetClass::Crypto) {
            continue;
        }
        let Some(instrument) = signal.instrument.as_deref() else {
            exclude(BRANCH_PRICE, "no_instrument", record.id);
            continue;
        };
        let series = index.get(instrument).unwrap_or(&empty);
        let Some(entry) = series.nearest(record.posted_at).filter(|p| *p > 0.0) else {
            exclude(BRANCH_PRICE, "no_entry_price", record.id);
            continue;
        };

        let benchmark = settings.benchmark_for(instrument);
        let bench_series = benchmark.map(|b| index.get(b).unwrap_or(&empty));
        let bench_entry = bench_series.and_then(|s| s.nearest(record.posted_at));

        for horizon in &settings.horizons {
            let exit_at = record.posted_at + Duration::seconds(horizon.seconds);
            let Some(exit) = series.nearest(exit_at) else {
                exclude(BRANCH_PRICE, "no_exit_price", record.id);
                continue;
            };
            let bench_exit = bench_series.and_then(|s| s.nearest(exit_at));
            if bench_series.is_some() && bench_exit.is_none() {
                exclude(BRANCH_PRICE, "no_benchmark_price", record.id);
                continue;
            }

            let realized = realized_return(entry, exit, signal.side);
            let benchmark_return = match (bench_entry, bench_exit) {
                (Some(b0), Some(b1)) if b0 != 0.0 => (b1 - b0) / b0,
                _ => 0.0,
            };

            let mut outcome = Outcome::new(
                record.id,
                EvaluationWindow::Horizon(horizon.label.clone()),
                exit_at,
            );
            outcome.realized_return = Some(realized);
            outcome.benchmark_return = Some(benchmark_return);
            outcome.excess_return = Some(realized - benchmark_return);
            outcome.notes = Some(format!("{} outcome", signal.asset_class));
            outcomes.push(outcome);
        }
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{at, priced};
    use super::super::Horizon;
    use super::*;

    const DAY: i64 = 86_400;

    fn bar(instrument: &str, ts: i64, price: f64) -> PriceBar {
        PriceBar {
            instrument: instrument.to_string(),
            ts: at(ts),
            price,
        }
    }

    fn settings(benchmark: Option<&str>) -> OutcomeSettings {
        OutcomeSettings {
            horizons: vec![Horizon {
                label: "1d".to_string(),
                seconds: DAY,
            }],
            equity_benchmark: benchmark.map(str::to_string),
            ..OutcomeSettings::default()
        }
    }

    #[test]
    fn test_long_with_benchmark() {
        let prices = vec![
            bar("AAPL", 0, 100.0),
            bar("AAPL", DAY, 110.0),
            bar("SPY", 0, 200.0),
            bar("SPY", DAY, 202.0),
        ];
        let records = vec![priced(1, AssetClass::Equity, "AAPL", Side::Long)];
        let outcomes = compute(&records, &prices, &settings(Some("SPY")));

        assert_eq!(outcomes.len(), 1);
        let o = &outcomes[0];
        assert_eq!(o.evaluation_window, EvaluationWindow::Horizon("1d".to_string()));
        assert_eq!(o.settled_at, at(DAY));
        assert!((o.realized_return.unwrap() - 0.10).abs() < 1e-12);
        assert!((o.benchmark_return.unwrap() - 0.01).abs() < 1e-12);
        assert!((o.excess_return.unwrap() - 0.09).abs() < 1e-12);
        assert_eq!(o.won, None);
    }

    #[test]
    fn test_short_is_exact_negation() {
        for (entry, exit) in [(100.0, 110.0), (37.5, 12.25), (3.0, 3.0)] {
            assert_eq!(
                realized_return(entry, exit, Side::Short),
                -realized_return(entry, exit, Side::Long)
            );
        }
    }

    #[test]
    fn test_missing_benchmark_exit_skips_horizon() {
        let prices = vec![bar("AAPL", 0, 100.0), bar("AAPL", DAY, 110.0)];
        let records = vec![priced(1, AssetClass::Equity, "AAPL", Side::Long)];
        assert!(compute(&records, &prices, &settings(Some("SPY"))).is_empty());

        let outcomes = compute(&records, &prices, &settings(None));
        assert_eq!(outcomes[0].benchmark_return, Some(0.0));
    }

    #[test]
    fn test_no_entry_price_excludes_signal() {
        let prices = vec![bar("AAPL", 0, 0.0)];
        let records = vec![
            priced(1, AssetClass::Equity, "AAPL", Side::Long),
            priced(2, AssetClass::Crypto, "SOL-USD", Side::Long),
        ];
        assert!(compute(&records, &prices, &settings(None)).is_empty());
    }
}
