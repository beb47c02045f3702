use std::sync::{Arc, LazyLock};

use common::types::{AssetClass, LineType, ParsedSignal, Side, SignalMeta, SportsMeta};
use regex::Regex;

use super::{raw_text, ParserTables, SignalParser};
use crate::text::{compile_all, contains_word, first_capture, parse_number};

const LEAGUE_WORDS: [(&str, [&str; 2]); 4] = [
    ("NFL", ["nfl", "football"]),
    ("NBA", ["nba", "basketball"]),
    ("MLB", ["mlb", "baseball"]),
    ("NHL", ["nhl", "hockey"]),
];

static SPREAD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([\+\-]\d+(?:\.\d)?)").unwrap());
static TOTAL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?i)[oO](\d+(?:\.\d)?)",
        r"(?i)[uU](\d+(?:\.\d)?)",
        r"(?i)(?:over|under)\s+(\d+(?:\.\d)?)",
    ])
});
static AMERICAN_ODDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\+\-]\d{3,4})").unwrap());
static TEAM_ABBREV: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([A-Z]{2,4})\b").unwrap());
static UNITS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile_all(&[r"(?i)(\d+(?:\.\d)?)\s*units?", r"(?i)(\d+(?:\.\d)?)\s*u\b"]));

/// Wording that stands in for an explicit unit count, strongest first.
const UNIT_WORDS: [([&str; 2], f64); 3] = [
    (["max", "hammer"], 5.0),
    (["strong", "love"], 3.0),
    (["lean", "small"], 1.0),
];

pub struct SportsParser {
    tables: Arc<ParserTables>,
}

impl SportsParser {
    pub fn new(tables: Arc<ParserTables>) -> Self {
        Self { tables }
    }

    /// League named outright, else the league of the first roster team mentioned.
    pub fn detect_league(&self, text: &str) -> Option<String> {
        let lower = text.to_lowercase();
        if let Some((league, _)) = LEAGUE_WORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        {
            return Some((*league).to_string());
        }
        self.tables
            .team_rosters
            .iter()
            .find(|(_, teams)| teams.iter().any(|t| contains_word(&lower, t)))
            .map(|(league, _)| league.clone())
    }

    /// An uppercase abbreviation that is not a league name, else the first
    /// three letters of a roster team.
    pub fn extract_team(&self, text: &str) -> Option<String> {
        let abbrev = TEAM_ABBREV
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .find(|word| !LEAGUE_WORDS.iter().any(|(league, _)| league == word));
        if let Some(abbrev) = abbrev {
            return Some(abbrev.to_string());
        }

        let lower = text.to_lowercase();
        self.tables
            .team_rosters
            .iter()
            .flat_map(|(_, teams)| teams)
            .find(|t| contains_word(&lower, t))
            .map(|t| t.to_uppercase().chars().take(3).collect())
    }
}

impl SignalParser for SportsParser {
    fn asset_class(&self) -> AssetClass {
        AssetClass::Sports
    }

    fn parse(&self, text: &str) -> Vec<ParsedSignal> {
        let Some(league) = self.detect_league(text) else {
            return Vec::new();
        };
        let Some((line_type, line)) = extract_bet_type(text) else {
            return Vec::new();
        };
        let team = self.extract_team(text);
        let units = extract_units(text);

        let side = match line_type {
            LineType::Total => {
                let lower = text.to_lowercase();
                let opening: String = lower.chars().take(3).collect();
                if lower.contains("over") || opening.contains('o') {
                    Side::Over
                } else {
                    Side::Under
                }
            }
            _ if line.is_some_and(|l| l < 0.0) => Side::Favorite,
            _ => Side::Underdog,
        };

        let mut signal = ParsedSignal::new(AssetClass::Sports, side)
            .with_confidence(Some(confidence_from_units(units)))
            .with_meta(SignalMeta::Sports(SportsMeta {
                league: Some(league.clone()),
            }))
            .with_aux("raw_text", raw_text(text));
        signal.instrument = Some(match &team {
            Some(team) => format!("{league}:{team}"),
            None => league,
        });
        signal.team = team;
        signal.line_type = Some(line_type);
        signal.line = line;
        signal.odds_price = extract_odds(text);
        signal.size = units;
        vec![signal]
    }
}

/// Signed number means spread; then o/u totals; then moneyline wording.
pub fn extract_bet_type(text: &str) -> Option<(LineType, Option<f64>)> {
    if let Some(line) = SPREAD.captures(text).and_then(|c| parse_number(&c[1])) {
        return Some((LineType::Spread, Some(line)));
    }
    if let Some(line) = first_capture(&TOTAL, text).and_then(parse_number) {
        return Some((LineType::Total, Some(line)));
    }
    let lower = text.to_lowercase();
    ["ml", "moneyline", "money line"]
        .iter()
        .any(|term| lower.contains(term))
        .then_some((LineType::Moneyline, None))
}

pub fn extract_odds(text: &str) -> Option<f64> {
    AMERICAN_ODDS
        .captures(text)
        .and_then(|c| parse_number(&c[1]))
}

pub fn extract_units(text: &str) -> Option<f64> {
    if let Some(units) = first_capture(&UNITS, text).and_then(parse_number) {
        return Some(units);
    }
    let lower = text.to_lowercase();
    UNIT_WORDS
        .iter()
        .find(|(words, _)| words.iter().any(|w| lower.contains(w)))
        .map(|(_, units)| *units)
}

fn confidence_from_units(units: Option<f64>) -> f64 {
    match units.filter(|u| *u != 0.0) {
        Some(u) if u >= 3.0 => 0.8,
        Some(u) if u >= 2.0 => 0.65,
        Some(u) if u <= 1.0 => 0.4,
        _ => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> SportsParser {
        SportsParser::new(Arc::new(ParserTables::default()))
    }

    #[test]
    fn test_spread_bet_on_abbreviated_team() {
        let signals = parser().parse("NFL: KC -3.5 -110, 3 units");
        assert_eq!(signals.len(), 1);
        let s = &signals[0];
        assert_eq!(s.instrument.as_deref(), Some("NFL:KC"));
        assert_eq!(s.team.as_deref(), Some("KC"));
        assert_eq!(s.side, Side::Favorite);
        assert_eq!(s.line_type, Some(LineType::Spread));
        assert_eq!(s.line, Some(-3.5));
        assert_eq!(s.odds_price, Some(-110.0));
        assert_eq!(s.size, Some(3.0));
        assert_eq!(s.confidence(), Some(0.8));
        assert_eq!(
            s.extracted.meta,
            SignalMeta::Sports(SportsMeta {
                league: Some("NFL".to_string()),
            })
        );
    }

    #[test]
    fn test_total_from_roster_mention() {
        let signals = parser().parse("lakers game over 224.5, lean");
        let s = &signals[0];
        assert_eq!(s.instrument.as_deref(), Some("NBA:LAK"));
        assert_eq!(s.side, Side::Over);
        assert_eq!(s.line_type, Some(LineType::Total));
        assert_eq!(s.line, Some(224.5));
        assert_eq!(s.confidence(), Some(0.4));
    }

    #[test]
    fn test_moneyline_has_no_line() {
        let signals = parser().parse("celtics BOS moneyline tonight");
        let s = &signals[0];
        assert_eq!(s.line_type, Some(LineType::Moneyline));
        assert_eq!(s.line, None);
        assert_eq!(s.side, Side::Underdog);
        assert_eq!(s.instrument.as_deref(), Some("NBA:BOS"));
        assert_eq!(s.confidence(), Some(0.5));
    }

    #[test]
    fn test_requires_league_and_bet_type() {
        assert!(parser().parse("what a game last night").is_empty());
        assert!(parser().parse("nba is fun to watch").is_empty());
    }

    #[test]
    fn test_units_from_wording() {
        assert_eq!(extract_units("hammer this"), Some(5.0));
        assert_eq!(extract_units("2.5u play"), Some(2.5));
        assert_eq!(extract_units("no size"), None);
        assert!((confidence_from_units(Some(2.5)) - 0.65).abs() < 1e-12);
        assert!((confidence_from_units(Some(1.5)) - 0.5).abs() < 1e-12);
    }
}
