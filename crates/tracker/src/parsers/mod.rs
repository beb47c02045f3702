//! Asset-class text parsers. Each maps one post text to zero or more signals
//! and never fails: text without an identifying token yields an empty vec.

use std::sync::Arc;

use common::config;
use common::types::{AssetClass, ParsedSignal};
use regex::Regex;

use crate::text::{
    classify_signal_quality, clean_text, confidence_from_language, extract_hashtags,
    extract_mentions, extract_risk_reward, extract_tickers, sentiment_emoji, tokenize_cashtags,
};
use crate::timeframe::parse_horizon_from_text;

pub mod crypto;
pub mod equity;
pub mod prediction;
pub mod sports;

pub use crypto::CryptoParser;
pub use equity::EquityParser;
pub use prediction::PredictionParser;
pub use sports::SportsParser;

/// Characters of post text kept in the `raw_text` aux entry.
const RAW_TEXT_CHARS: usize = 500;

pub trait SignalParser: Send + Sync {
    fn asset_class(&self) -> AssetClass;
    fn parse(&self, text: &str) -> Vec<ParsedSignal>;
}

/// URL/prefix patterns for one prediction platform, tried in order.
#[derive(Debug, Clone)]
pub struct PlatformPatterns {
    pub platform: String,
    pub patterns: Vec<Regex>,
}

/// Immutable lookup data shared by the parsers. Table order is match priority.
#[derive(Debug, Clone)]
pub struct ParserTables {
    /// Symbol and its lowercase names / aliases.
    pub crypto_symbols: Vec<(String, Vec<String>)>,
    /// League and lowercase team names.
    pub team_rosters: Vec<(String, Vec<String>)>,
    pub platforms: Vec<PlatformPatterns>,
}

impl Default for ParserTables {
    fn default() -> Self {
        Self {
            crypto_symbols: owned_table(CRYPTO_SYMBOLS),
            team_rosters: owned_table(TEAM_ROSTERS),
            platforms: PLATFORM_PATTERNS
                .iter()
                .map(|(platform, patterns)| PlatformPatterns {
                    platform: (*platform).to_string(),
                    patterns: crate::text::compile_all(patterns),
                })
                .collect(),
        }
    }
}

impl ParserTables {
    /// Built-in tables with the configured extras appended after them.
    pub fn with_extras(extras: &config::Parsers) -> Self {
        let mut tables = Self::default();
        for (symbol, names) in &extras.extra_crypto_symbols {
            let symbol = symbol.to_ascii_uppercase();
            let names = names.iter().map(|n| n.to_lowercase()).collect();
            tables.crypto_symbols.push((symbol, names));
        }
        for (league, teams) in &extras.extra_teams {
            let league = league.to_ascii_uppercase();
            let teams: Vec<String> = teams.iter().map(|t| t.to_lowercase()).collect();
            match tables.team_rosters.iter_mut().find(|(l, _)| *l == league) {
                Some((_, roster)) => roster.extend(teams),
                None => tables.team_rosters.push((league, teams)),
            }
        }
        tables
    }

    pub fn is_crypto_symbol(&self, symbol: &str) -> bool {
        self.crypto_symbols.iter().any(|(s, _)| s == symbol)
    }
}

/// All four parsers; results concatenate in equity, crypto, prediction, sports order.
pub struct ParserSet {
    parsers: Vec<Box<dyn SignalParser>>,
}

impl ParserSet {
    pub fn new(tables: Arc<ParserTables>) -> Self {
        Self {
            parsers: vec![
                Box::new(EquityParser),
                Box::new(CryptoParser::new(tables.clone())),
                Box::new(PredictionParser::new(tables.clone())),
                Box::new(SportsParser::new(tables)),
            ],
        }
    }

    /// Every parser's signals, each tagged with the post-wide context in its aux bag.
    pub fn parse_all(&self, text: &str) -> Vec<ParsedSignal> {
        let signals: Vec<ParsedSignal> = self.parsers.iter().flat_map(|p| p.parse(text)).collect();
        if signals.is_empty() {
            return signals;
        }
        let context = PostContext::of(text);
        signals.into_iter().map(|s| context.attach(s)).collect()
    }
}

/// Readings that describe the whole post rather than one signal.
#[derive(Debug, Clone, PartialEq)]
pub struct PostContext {
    pub quality: &'static str,
    pub risk_reward: Option<(f64, f64)>,
    pub language_confidence: f64,
    pub stated_horizon_seconds: Option<i64>,
    pub emoji_bullish: usize,
    pub emoji_bearish: usize,
    pub tickers: Vec<String>,
    pub forex: Vec<String>,
    pub mentions: Vec<String>,
    pub hashtags: Vec<String>,
}

impl PostContext {
    pub fn of(text: &str) -> Self {
        let emoji = sentiment_emoji(text);
        Self {
            quality: classify_signal_quality(text).as_str(),
            risk_reward: extract_risk_reward(text),
            language_confidence: confidence_from_language(text),
            stated_horizon_seconds: parse_horizon_from_text(text),
            emoji_bullish: emoji.bullish,
            emoji_bearish: emoji.bearish,
            tickers: extract_tickers(text),
            forex: tokenize_cashtags(text).forex,
            mentions: extract_mentions(text),
            hashtags: extract_hashtags(text),
        }
    }

    /// Absent readings and empty lists are left out of the bag.
    pub fn attach(&self, signal: ParsedSignal) -> ParsedSignal {
        let mut s = signal
            .with_aux("signal_quality", self.quality)
            .with_aux("language_confidence", self.language_confidence)
            .with_aux("emoji_bullish", self.emoji_bullish)
            .with_aux("emoji_bearish", self.emoji_bearish);
        if let Some((risk, reward)) = self.risk_reward {
            s = s.with_aux("risk_reward", vec![risk, reward]);
        }
        if let Some(secs) = self.stated_horizon_seconds {
            s = s.with_aux("stated_horizon_seconds", secs);
        }
        for (key, list) in [
            ("tickers", &self.tickers),
            ("forex", &self.forex),
            ("mentions", &self.mentions),
            ("hashtags", &self.hashtags),
        ] {
            if !list.is_empty() {
                s = s.with_aux(key, list.clone());
            }
        }
        s
    }
}

fn owned_table(table: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
    table
        .iter()
        .map(|(key, names)| {
            (
                (*key).to_string(),
                names.iter().map(|n| (*n).to_string()).collect(),
            )
        })
        .collect()
}

pub(crate) fn raw_text(text: &str) -> String {
    clean_text(text).chars().take(RAW_TEXT_CHARS).collect()
}

const CRYPTO_SYMBOLS: &[(&str, &[&str])] = &[
    ("BTC", &["bitcoin", "btc"]),
    ("ETH", &["ethereum", "eth", "ether"]),
    ("BNB", &["binance", "bnb"]),
    ("SOL", &["solana", "sol"]),
    ("XRP", &["ripple", "xrp"]),
    ("ADA", &["cardano", "ada"]),
    ("AVAX", &["avalanche", "avax"]),
    ("DOGE", &["dogecoin", "doge"]),
    ("DOT", &["polkadot", "dot"]),
    ("MATIC", &["polygon", "matic"]),
    ("LINK", &["chainlink", "link"]),
    ("UNI", &["uniswap", "uni"]),
    ("ATOM", &["cosmos", "atom"]),
    ("ARB", &["arbitrum", "arb"]),
    ("OP", &["optimism", "op"]),
    ("INJ", &["injective", "inj"]),
    ("TIA", &["celestia", "tia"]),
    ("SEI", &["sei"]),
    ("PEPE", &["pepe"]),
    ("WLD", &["worldcoin", "wld"]),
    ("BLUR", &["blur"]),
    ("FET", &["fetch", "fet"]),
    ("RNDR", &["render", "rndr"]),
    ("NEAR", &["near"]),
    ("APT", &["aptos", "apt"]),
    ("SUI", &["sui"]),
    ("USDT", &["tether", "usdt"]),
    ("USDC", &["usdc", "usd coin"]),
];

const TEAM_ROSTERS: &[(&str, &[&str])] = &[
    (
        "NFL",
        &["chiefs", "bills", "49ers", "eagles", "cowboys", "ravens", "bengals", "dolphins"],
    ),
    (
        "NBA",
        &["lakers", "celtics", "heat", "warriors", "bucks", "nuggets", "suns", "76ers"],
    ),
    (
        "MLB",
        &["yankees", "dodgers", "astros", "braves", "rays", "orioles", "rangers"],
    ),
    (
        "NHL",
        &["avalanche", "oilers", "panthers", "rangers", "stars", "bruins"],
    ),
];

const PLATFORM_PATTERNS: &[(&str, &[&str])] = &[
    (
        "polymarket",
        &[
            r"(?i)polymarket\.com/event/([a-zA-Z0-9\-]+)",
            r"(?i)polymarket\.com/market/([a-zA-Z0-9\-]+)",
            r"(?i)poly\.market/([a-zA-Z0-9\-]+)",
            r"(?i)pm:([a-zA-Z0-9\-]+)",
        ],
    ),
    (
        "manifold",
        &[
            r"(?i)manifold\.markets/([a-zA-Z0-9\-_]+)/([a-zA-Z0-9\-_]+)",
            r"(?i)manifold\.markets/embed/([a-zA-Z0-9\-_]+)",
            r"(?i)mm:([a-zA-Z0-9\-_]+)",
        ],
    ),
    (
        "metaculus",
        &[r"(?i)metaculus\.com/questions/(\d+)", r"(?i)metaculus:(\d+)"],
    ),
    (
        "kalshi",
        &[r"(?i)kalshi\.com/markets/([a-zA-Z0-9\-]+)", r"(?i)kalshi:([a-zA-Z0-9\-]+)"],
    ),
    (
        "predictit",
        &[r"(?i)predictit\.org/markets/detail/(\d+)", r"(?i)predictit:(\d+)"],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_no_identifying_token_yields_nothing_from_every_parser() {
        let set = ParserSet::new(Arc::new(ParserTables::default()));
        for text in ["gm everyone, coffee time", "", "what a lovely day it is outside"] {
            for parser in &set.parsers {
                assert!(
                    parser.parse(text).is_empty(),
                    "{} parser produced a signal for {text:?}",
                    parser.asset_class()
                );
            }
        }
    }

    #[test]
    fn test_parse_all_concatenates_in_parser_order() {
        let set = ParserSet::new(Arc::new(ParserTables::default()));
        let signals = set.parse_all("$AAPL calls, target $195, entry $188, stop $185, high conviction");
        assert_eq!(signals[0].asset_class, AssetClass::Equity);
        assert!(signals
            .windows(2)
            .all(|w| w[0].asset_class <= w[1].asset_class));
    }

    #[test]
    fn test_parse_all_attaches_post_context() {
        let set = ParserSet::new(Arc::new(ParserTables::default()));
        let signals = set.parse_all(
            "@desk $AAPL entry 188, long, stop 185 target 197, swing trade 🚀 #earnings",
        );
        assert!(!signals.is_empty());
        for s in &signals {
            let aux = &s.extracted.aux;
            assert_eq!(aux["signal_quality"], "high");
            assert_eq!(aux["emoji_bullish"], 1);
            assert_eq!(aux["emoji_bearish"], 0);
            assert_eq!(aux["risk_reward"], serde_json::json!([1.0, 3.0]));
            assert_eq!(aux["stated_horizon_seconds"], crate::timeframe::WEEK);
            assert_eq!(aux["tickers"], serde_json::json!(["AAPL"]));
            assert_eq!(aux["mentions"], serde_json::json!(["desk"]));
            assert_eq!(aux["hashtags"], serde_json::json!(["earnings"]));
            assert!(!aux.contains_key("forex"));
        }
    }

    #[test]
    fn test_raw_text_is_cleaned_and_capped() {
        assert_eq!(raw_text("  buy\n\n $AAPL  "), "buy $AAPL");
        assert_eq!(raw_text(&"x".repeat(900)).chars().count(), RAW_TEXT_CHARS);
    }

    #[test]
    fn test_extras_append_after_builtins() {
        let extras = config::Parsers {
            extra_crypto_symbols: BTreeMap::from([("jup".to_string(), vec!["Jupiter".to_string()])]),
            extra_teams: BTreeMap::from([
                ("nfl".to_string(), vec!["Packers".to_string()]),
                ("MLS".to_string(), vec!["galaxy".to_string()]),
            ]),
        };
        let tables = ParserTables::with_extras(&extras);
        assert_eq!(tables.crypto_symbols[0].0, "BTC");
        assert_eq!(
            tables.crypto_symbols.last(),
            Some(&("JUP".to_string(), vec!["jupiter".to_string()]))
        );
        assert!(tables.is_crypto_symbol("JUP"));

        let nfl = &tables.team_rosters[0];
        assert_eq!(nfl.0, "NFL");
        assert_eq!(nfl.1.last().map(String::as_str), Some("packers"));
        assert_eq!(tables.team_rosters.last().map(|(l, _)| l.as_str()), Some("MLS"));
    }

    #[test]
    fn test_raw_text_truncates_on_char_boundary() {
        let long = "🚀".repeat(600);
        assert_eq!(raw_text(&long).chars().count(), RAW_TEXT_CHARS);
    }
}
