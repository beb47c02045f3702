//! Joins stored signals against market reference series. Three independent
//! branches; a signal lacking reference data is excluded, never an error.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use common::config;
use common::types::{MarketReference, Outcome, SignalRecord};

use crate::timeframe::parse_timeframe;

pub mod equity;
pub mod prediction;
pub mod series;
pub mod sports;

/// One evaluation horizon for price-based signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Horizon {
    pub label: String,
    pub seconds: i64,
}

#[derive(Debug, Clone, Default)]
pub struct OutcomeSettings {
    pub horizons: Vec<Horizon>,
    pub equity_benchmark: Option<String>,
    pub crypto_benchmark: Option<String>,
    pub benchmark_overrides: BTreeMap<String, String>,
}

impl OutcomeSettings {
    pub fn from_config(cfg: &config::Outcomes) -> Result<Self> {
        let horizons = cfg
            .horizons
            .iter()
            .map(|label| {
                let seconds = parse_timeframe(label)
                    .with_context(|| format!("invalid outcome horizon {label:?}"))?;
                Ok(Horizon {
                    label: label.clone(),
                    seconds,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            horizons,
            equity_benchmark: cfg.equity_benchmark.clone(),
            crypto_benchmark: cfg.crypto_benchmark.clone(),
            benchmark_overrides: cfg.benchmark_overrides.clone(),
        })
    }

    /// Override first; dashed instruments are crypto pairs. Never the instrument itself.
    pub fn benchmark_for(&self, instrument: &str) -> Option<&str> {
        let benchmark = match self.benchmark_overrides.get(instrument) {
            Some(b) => Some(b.as_str()),
            None if instrument.contains('-') => self.crypto_benchmark.as_deref(),
            None => self.equity_benchmark.as_deref(),
        };
        benchmark.filter(|b| *b != instrument)
    }
}

/// Outcome branch names, used as metric labels.
pub const BRANCH_PRICE: &str = "price";
pub const BRANCH_PREDICTION: &str = "prediction";
pub const BRANCH_SPORTS: &str = "sports";

pub(crate) fn exclude(branch: &'static str, reason: &'static str, signal_id: i64) {
    tracing::debug!(branch, reason, signal_id, "signal excluded from outcomes");
    metrics::counter!("tracker_signals_excluded_total", "branch" => branch, "reason" => reason)
        .increment(1);
}

/// All branches over the full signal population, concatenated.
pub fn compute_all(
    records: &[SignalRecord],
    refs: &MarketReference,
    settings: &OutcomeSettings,
) -> Vec<Outcome> {
    let price = equity::compute(records, &refs.prices, settings);
    let predictions = prediction::compute(records, &refs.quotes, &refs.resolutions);
    let sports = sports::compute(records, &refs.events, &refs.lines);

    for (branch, rows) in [
        (BRANCH_PRICE, &price),
        (BRANCH_PREDICTION, &predictions),
        (BRANCH_SPORTS, &sports),
    ] {
        metrics::counter!("tracker_outcomes_computed_total", "branch" => branch)
            .increment(rows.len() as u64);
    }
    tracing::info!(
        price = price.len(),
        prediction = predictions.len(),
        sports = sports.len(),
        "outcomes computed"
    );

    let mut outcomes = price;
    outcomes.extend(predictions);
    outcomes.extend(sports);
    outcomes
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};
    use common::types::{AssetClass, ParsedSignal, Side, SignalRecord};

    pub fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    pub fn record(id: i64, signal: ParsedSignal) -> SignalRecord {
        SignalRecord {
            id,
            account_id: 1,
            posted_at: at(0),
            signal,
        }
    }

    pub fn priced(id: i64, asset_class: AssetClass, instrument: &str, side: Side) -> SignalRecord {
        let mut signal = ParsedSignal::new(asset_class, side);
        signal.instrument = Some(instrument.to_string());
        record(id, signal)
    }
}
