use std::collections::HashMap;

use common::types::{
    AssetClass, EvaluationWindow, MarketOutcome, Outcome, PredictionQuote, PredictionResolution,
    Side, SignalMeta, SignalRecord,
};

use super::series::index_series;
use super::{exclude, BRANCH_PREDICTION};

/// Squared error of the side-adjusted probability against the YES indicator.
/// A NO caller is scored on `1 - p` but the target stays "did YES happen".
pub fn brier(stated_yes: f64, side: Side, resolved_yes: bool) -> f64 {
    let p = match side {
        Side::No => 1.0 - stated_yes,
        _ => stated_yes,
    };
    let realized = if resolved_yes { 1.0 } else { 0.0 };
    (p - realized).powi(2)
}

pub fn compute(
    records: &[SignalRecord],
    quotes: &[PredictionQuote],
    resolutions: &[PredictionResolution],
) -> Vec<Outcome> {
    let index = index_series(
        quotes
            .iter()
            .map(|q| (q.market_ref.as_str(), q.ts, q.yes_price)),
    );
    // Last resolution wins when a market is listed twice.
    let resolved: HashMap<&str, &PredictionResolution> = resolutions
        .iter()
        .map(|r| (r.market_ref.as_str(), r))
        .collect();

    let mut outcomes = Vec::new();
    for record in records {
        let signal = &record.signal;
        if signal.asset_class != AssetClass::Prediction {
            continue;
        }
        let market_ref = signal.market_ref.as_deref().unwrap_or_default();
        let Some(entry_yes) = index
            .get(market_ref)
            .and_then(|s| s.nearest(record.posted_at))
        else {
            exclude(BRANCH_PREDICTION, "no_quote", record.id);
            continue;
        };
        let Some(resolution) = resolved.get(market_ref) else {
            exclude(BRANCH_PREDICTION, "unresolved", record.id);
            continue;
        };

        let resolved_yes = resolution.outcome == MarketOutcome::Yes;
        let (entry_price, won) = match signal.side {
            Side::No => (1.0 - entry_yes, !resolved_yes),
            _ => (entry_yes, resolved_yes),
        };
        let stated = match &signal.extracted.meta {
            SignalMeta::Prediction(meta) => meta.probability,
            _ => None,
        }
        .or(signal.odds_price);

        let mut outcome = Outcome::new(record.id, EvaluationWindow::Event, resolution.resolved_at);
        let payout = if won { 1.0 } else { 0.0 };
        outcome.pnl_per_contract = Some(payout - entry_price);
        outcome.won = Some(won);
        outcome.brier = stated.map(|p| brier(p, signal.side, resolved_yes));
        outcome.notes = Some("prediction outcome".to_string());
        outcomes.push(outcome);
    }
    outcomes
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{at, record};
    use super::*;
    use common::types::{ParsedSignal, PredictionMeta};

    fn signal(side: Side, probability: Option<f64>) -> ParsedSignal {
        let mut s = ParsedSignal::new(AssetClass::Prediction, side).with_meta(
            SignalMeta::Prediction(PredictionMeta {
                probability,
                ..PredictionMeta::default()
            }),
        );
        s.market_ref = Some("fed-cut".to_string());
        s
    }

    fn quote(ts: i64, yes_price: f64) -> PredictionQuote {
        PredictionQuote {
            market_ref: "fed-cut".to_string(),
            ts: at(ts),
            yes_price,
        }
    }

    fn resolution(outcome: MarketOutcome) -> Vec<PredictionResolution> {
        vec![PredictionResolution {
            market_ref: "fed-cut".to_string(),
            outcome,
            resolved_at: at(1_000),
        }]
    }

    #[test]
    fn test_yes_at_forty_cents_resolving_yes() {
        let records = vec![record(1, signal(Side::Yes, None))];
        let outcomes = compute(&records, &[quote(0, 0.40)], &resolution(MarketOutcome::Yes));

        assert_eq!(outcomes.len(), 1);
        let o = &outcomes[0];
        assert!((o.pnl_per_contract.unwrap() - 0.60).abs() < 1e-12);
        assert_eq!(o.won, Some(true));
        assert_eq!(o.brier, None);
        assert_eq!(o.evaluation_window, EvaluationWindow::Event);
        assert_eq!(o.settled_at, at(1_000));
    }

    #[test]
    fn test_no_side_flips_entry_and_probability() {
        let records = vec![record(1, signal(Side::No, Some(0.30)))];
        let outcomes = compute(&records, &[quote(0, 0.25)], &resolution(MarketOutcome::No));
        let o = &outcomes[0];
        assert!((o.pnl_per_contract.unwrap() - 0.25).abs() < 1e-12);
        assert_eq!(o.won, Some(true));
        // Stated 0.30 YES reads as 0.70 for a NO caller, scored against YES = 0.
        assert!((o.brier.unwrap() - 0.49).abs() < 1e-12);
    }

    #[test]
    fn test_brier_targets_yes_resolution() {
        assert!((brier(0.30, Side::No, false) - 0.49).abs() < 1e-12);
        assert!((brier(0.30, Side::No, true) - 0.09).abs() < 1e-12);
        assert!((brier(0.80, Side::Yes, true) - 0.04).abs() < 1e-12);
        assert!((brier(0.80, Side::Yes, false) - 0.64).abs() < 1e-12);
    }

    #[test]
    fn test_missing_quote_or_resolution_excludes() {
        let records = vec![record(1, signal(Side::Yes, None))];
        assert!(compute(&records, &[], &resolution(MarketOutcome::Yes)).is_empty());
        assert!(compute(&records, &[quote(0, 0.5)], &[]).is_empty());
    }
}
