use std::collections::HashMap;

use common::types::{
    AssetClass, EvaluationWindow, LineType, Outcome, ParsedSignal, Side, SignalRecord, SportsEvent,
    SportsLine,
};

use super::{exclude, BRANCH_SPORTS};

/// Final margin from `team`'s point of view, when the team and both scores are known.
pub fn team_margin(event: &SportsEvent, team: &str) -> Option<i64> {
    let (s1, s2) = (event.score1?, event.score2?);
    if team.eq_ignore_ascii_case(&event.team1) {
        Some(s1 - s2)
    } else if team.eq_ignore_ascii_case(&event.team2) {
        Some(s2 - s1)
    } else {
        None
    }
}

pub fn compute(
    records: &[SignalRecord],
    events: &[SportsEvent],
    lines: &[SportsLine],
) -> Vec<Outcome> {
    let by_id: HashMap<&str, &SportsEvent> =
        events.iter().map(|e| (e.event_id.as_str(), e)).collect();

    let mut outcomes = Vec::new();
    for record in records {
        let signal = &record.signal;
        if signal.asset_class != AssetClass::Sports {
            continue;
        }
        let Some(event) = signal
            .market_ref
            .as_deref()
            .and_then(|id| by_id.get(id))
        else {
            exclude(BRANCH_SPORTS, "no_event", record.id);
            continue;
        };
        // First closing line listed for this event and bet type.
        let closing = lines
            .iter()
            .find(|l| {
                l.is_closing && l.event_id == event.event_id && Some(l.line_type) == signal.line_type
            })
            .and_then(|l| l.line);

        let (clv_points, won) = settle(signal, event, closing);
        let mut outcome = Outcome::new(record.id, EvaluationWindow::Event, event.start_time);
        outcome.clv_points = clv_points;
        outcome.won = won;
        outcome.notes = Some("sports outcome".to_string());
        outcomes.push(outcome);
    }
    outcomes
}

/// CLV and win flag for one bet; any missing input leaves its field empty.
fn settle(
    signal: &ParsedSignal,
    event: &SportsEvent,
    closing: Option<f64>,
) -> (Option<f64>, Option<bool>) {
    let margin = signal
        .team
        .as_deref()
        .and_then(|team| team_margin(event, team));
    match signal.line_type {
        Some(LineType::Spread) => {
            let clv = signal.line.zip(closing).map(|(posted, close)| posted - close);
            let won = margin
                .zip(signal.line)
                .map(|(m, line)| m as f64 - line > 0.0);
            (clv, won)
        }
        Some(LineType::Total) => {
            let over = signal.side == Side::Over;
            let clv = signal.line.zip(closing).map(|(posted, close)| {
                if over {
                    posted - close
                } else {
                    close - posted
                }
            });
            let total = event.score1.zip(event.score2).map(|(a, b)| (a + b) as f64);
            let won = total.zip(signal.line).map(|(total, posted)| {
                if over {
                    total > posted
                } else {
                    total < posted
                }
            });
            (clv, won)
        }
        Some(LineType::Moneyline) => (None, margin.map(|m| m > 0)),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::{at, record};
    use super::*;

    fn event() -> SportsEvent {
        SportsEvent {
            event_id: "nfl-2024-kc-buf".to_string(),
            team1: "KC".to_string(),
            team2: "BUF".to_string(),
            score1: Some(27),
            score2: Some(22),
            start_time: at(5_000),
        }
    }

    fn closing(line_type: LineType, line: f64) -> SportsLine {
        SportsLine {
            event_id: "nfl-2024-kc-buf".to_string(),
            line_type,
            line: Some(line),
            is_closing: true,
        }
    }

    fn bet(side: Side, team: Option<&str>, line_type: LineType, line: Option<f64>) -> SignalRecord {
        let mut s = ParsedSignal::new(AssetClass::Sports, side);
        s.market_ref = Some("nfl-2024-kc-buf".to_string());
        s.team = team.map(str::to_string);
        s.line_type = Some(line_type);
        s.line = line;
        record(1, s)
    }

    #[test]
    fn test_spread_clv_and_cover() {
        let records = vec![bet(Side::Favorite, Some("KC"), LineType::Spread, Some(-3.5))];
        let lines = vec![
            closing(LineType::Total, 47.5),
            closing(LineType::Spread, -3.0),
        ];
        let outcomes = compute(&records, &[event()], &lines);
        let o = &outcomes[0];
        assert!((o.clv_points.unwrap() + 0.5).abs() < 1e-12);
        assert_eq!(o.won, Some(true));
        assert_eq!(o.settled_at, at(5_000));
    }

    #[test]
    fn test_margin_flips_for_second_team() {
        let e = event();
        assert_eq!(team_margin(&e, "kc"), Some(5));
        assert_eq!(team_margin(&e, "BUF"), Some(-5));
        assert_eq!(team_margin(&e, "NYJ"), None);
    }

    #[test]
    fn test_total_is_directional() {
        let lines = vec![closing(LineType::Total, 47.5)];
        let over = compute(&[bet(Side::Over, None, LineType::Total, Some(45.5))], &[event()], &lines);
        assert_eq!(over[0].clv_points, Some(-2.0));
        assert_eq!(over[0].won, Some(true));

        let under = compute(&[bet(Side::Under, None, LineType::Total, Some(45.5))], &[event()], &lines);
        assert_eq!(under[0].clv_points, Some(2.0));
        assert_eq!(under[0].won, Some(false));
    }

    #[test]
    fn test_missing_inputs_leave_fields_empty() {
        let ml = compute(&[bet(Side::Underdog, Some("BUF"), LineType::Moneyline, None)], &[event()], &[]);
        assert_eq!(ml[0].clv_points, None);
        assert_eq!(ml[0].won, Some(false));

        let no_team = compute(&[bet(Side::Favorite, None, LineType::Spread, Some(-3.5))], &[event()], &[]);
        assert_eq!(no_team.len(), 1);
        assert_eq!(no_team[0].clv_points, None);
        assert_eq!(no_team[0].won, None);

        let mut unknown = bet(Side::Favorite, Some("KC"), LineType::Spread, Some(-3.5));
        unknown.signal.market_ref = Some("elsewhere".to_string());
        assert!(compute(&[unknown], &[event()], &[]).is_empty());
    }
}
