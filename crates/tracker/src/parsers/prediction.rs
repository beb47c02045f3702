use std::sync::{Arc, LazyLock};

use common::types::{AssetClass, ParsedSignal, PredictionMeta, Side, SignalMeta};
use regex::Regex;
use url::Url;

use super::{raw_text, ParserTables, SignalParser};
use crate::text::{extract_urls, hash_text, parse_number};
use crate::timeframe::{DAY, MONTH, QUARTER, WEEK, YEAR};

/// Words that make a post without a market link worth a synthetic reference.
const MARKET_CONTEXT: [&str; 7] = [
    "polymarket",
    "manifold",
    "metaculus",
    "kalshi",
    "prediction",
    "bet",
    "odds",
];
const SYNTHETIC_REF_CHARS: usize = 100;

const YES_TERMS: [&str; 8] = [
    "yes",
    "buy yes",
    "long yes",
    "agree",
    "will happen",
    "bullish",
    "support",
    "for",
];
const NO_TERMS: [&str; 8] = [
    "no",
    "buy no",
    "long no",
    "disagree",
    "won't happen",
    "bearish",
    "against",
    "fade",
];

static ANY_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").unwrap());

enum Scale {
    /// Percent, or already a fraction when the value is at most 1.
    Percent,
    Cents,
}

static PROBABILITY: LazyLock<Vec<(Regex, Scale)>> = LazyLock::new(|| {
    [
        (
            r"(?i)(\d+(?:\.\d+)?)\s*%\s*(?:chance|probability|likely|odds|prob)",
            Scale::Percent,
        ),
        (
            r"(?i)(?:probability|chance|likely|odds|prob)\s*(?:is|at|of)?\s*(\d+(?:\.\d+)?)\s*%",
            Scale::Percent,
        ),
        (
            r"(?i)(?:i\s+(?:think|believe|estimate))\s*(\d+(?:\.\d+)?)\s*%",
            Scale::Percent,
        ),
        (r"(?i)(?:market\s+(?:is|at))\s*(\d+(?:\.\d+)?)\s*%", Scale::Percent),
        (
            r"(?i)(?:currently|now|trading)\s*(?:at)?\s*(\d+(?:\.\d+)?)[c¢]",
            Scale::Cents,
        ),
    ]
    .into_iter()
    .map(|(p, scale)| (Regex::new(p).unwrap(), scale))
    .collect()
});

/// Checked as substrings in this order; the first phrase present wins.
const QUALITATIVE_PROBABILITY: [(&str, f64); 9] = [
    ("very likely", 0.80),
    ("likely", 0.70),
    ("probable", 0.65),
    ("toss up", 0.50),
    ("coin flip", 0.50),
    ("unlikely", 0.30),
    ("very unlikely", 0.20),
    ("long shot", 0.15),
    ("no chance", 0.05),
];

#[derive(Clone, Copy)]
enum Stake {
    Dollars,
    Contracts,
}

static STAKE: LazyLock<Vec<(Regex, Stake)>> = LazyLock::new(|| {
    [
        (
            r"(?i)\$(\d+(?:,\d{3})*(?:\.\d+)?)\s*(?:on|in|position|bet)",
            Stake::Dollars,
        ),
        (r"(?i)(\d+(?:,\d{3})*)\s*(?:shares?|contracts?)", Stake::Contracts),
        (
            r"(?i)(?:bet|wager|position)\s*(?:of|size)?\s*\$(\d+(?:,\d{3})*(?:\.\d+)?)",
            Stake::Dollars,
        ),
    ]
    .into_iter()
    .map(|(p, stake)| (Regex::new(p).unwrap(), stake))
    .collect()
});

/// Assumed average contract price when only a contract count is stated.
const CONTRACT_PRICE_ESTIMATE: f64 = 0.5;

static RESOLUTION: LazyLock<Vec<(Regex, Option<i64>)>> = LazyLock::new(|| {
    [
        (r"(?:resolves?|settles?|closes?)\s+today", Some(DAY)),
        (r"(?:resolves?|settles?|closes?)\s+(?:this\s+)?week", Some(WEEK)),
        (r"(?:resolves?|settles?|closes?)\s+(?:this\s+)?month", Some(MONTH)),
        (r"(?:resolves?|settles?|closes?)\s+(?:by|before|on)\s+(\w+)", None),
        (r"(?:election|debate|event)\s+(?:day|night)", Some(DAY)),
        (r"(?:earnings|report|announcement)", Some(3 * DAY)),
    ]
    .into_iter()
    .map(|(p, secs)| (Regex::new(p).unwrap(), secs))
    .collect()
});

const CATEGORIES: [(&str, &[&str]); 7] = [
    (
        "politics",
        &[
            "election",
            "president",
            "congress",
            "senate",
            "governor",
            "vote",
            "poll",
            "democrat",
            "republican",
            "gop",
            "biden",
            "trump",
        ],
    ),
    (
        "economics",
        &[
            "gdp",
            "inflation",
            "cpi",
            "unemployment",
            "fed",
            "rate",
            "recession",
            "jobs",
            "fomc",
        ],
    ),
    (
        "crypto",
        &["bitcoin", "ethereum", "btc", "eth", "crypto", "defi", "nft"],
    ),
    (
        "sports",
        &[
            "nfl",
            "nba",
            "mlb",
            "nhl",
            "soccer",
            "football",
            "basketball",
            "baseball",
            "championship",
            "playoffs",
            "super bowl",
        ],
    ),
    (
        "tech",
        &[
            "ai",
            "gpt",
            "chatgpt",
            "google",
            "apple",
            "microsoft",
            "tesla",
            "ipo",
            "launch",
        ],
    ),
    (
        "weather",
        &["hurricane", "temperature", "rain", "snow", "storm", "climate"],
    ),
    (
        "entertainment",
        &["oscar", "emmy", "movie", "box office", "album", "spotify"],
    ),
];

/// A market identifier and the platform it was recognised on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRef {
    pub market_ref: String,
    pub platform: Option<String>,
}

pub struct PredictionParser {
    tables: Arc<ParserTables>,
}

impl PredictionParser {
    pub fn new(tables: Arc<ParserTables>) -> Self {
        Self { tables }
    }

    /// Platform patterns in table order, then a bare URL on a known domain.
    pub fn extract_market_ref(&self, text: &str) -> Option<MarketRef> {
        for platform in &self.tables.platforms {
            for re in &platform.patterns {
                if let Some(c) = re.captures(text) {
                    let market_ref = match (c.get(1), c.get(2)) {
                        (Some(a), Some(b)) if platform.platform == "manifold" => {
                            format!("{}/{}", a.as_str(), b.as_str())
                        }
                        (Some(a), _) => a.as_str().to_string(),
                        _ => continue,
                    };
                    return Some(MarketRef {
                        market_ref,
                        platform: Some(platform.platform.clone()),
                    });
                }
            }
        }

        let url = Url::parse(extract_urls(text).first()?).ok()?;
        let domain = url.host_str()?.to_lowercase();
        let parts: Vec<&str> = url.path().split('/').collect();
        let last = parts.last().copied().unwrap_or_default();
        let (market_ref, platform) = if domain.contains("polymarket") {
            (last.to_string(), "polymarket")
        } else if domain.contains("manifold") && parts.len() >= 3 {
            (format!("{}/{last}", parts[parts.len() - 2]), "manifold")
        } else if domain.contains("metaculus") {
            (last.to_string(), "metaculus")
        } else if domain.contains("kalshi") {
            (last.to_string(), "kalshi")
        } else {
            return None;
        };
        (!market_ref.is_empty()).then(|| MarketRef {
            market_ref,
            platform: Some(platform.to_string()),
        })
    }

    /// Every platform-pattern reference in the text, deduplicated, in table order.
    fn all_refs(&self, text: &str) -> Vec<String> {
        let mut refs: Vec<String> = Vec::new();
        for re in self.tables.platforms.iter().flat_map(|p| &p.patterns) {
            for c in re.captures_iter(text) {
                let found = match (c.get(1), c.get(2)) {
                    (Some(a), Some(b)) => format!("{}/{}", a.as_str(), b.as_str()),
                    (Some(a), None) => a.as_str().to_string(),
                    _ => continue,
                };
                if !refs.contains(&found) {
                    refs.push(found);
                }
            }
        }
        refs
    }
}

impl SignalParser for PredictionParser {
    fn asset_class(&self) -> AssetClass {
        AssetClass::Prediction
    }

    fn parse(&self, text: &str) -> Vec<ParsedSignal> {
        let lower = text.to_lowercase();
        let found = match self.extract_market_ref(text) {
            Some(found) => found,
            None if MARKET_CONTEXT.iter().any(|w| lower.contains(w)) => MarketRef {
                market_ref: synthetic_market_ref(text),
                platform: None,
            },
            None => return Vec::new(),
        };

        let probability = extract_probability(text);
        let side = match extract_position(text) {
            Some(side) => side,
            None => match probability.filter(|p| *p > 0.0) {
                Some(p) if p > 0.5 => Side::Yes,
                Some(_) => Side::No,
                None => return Vec::new(),
            },
        };
        let confidence = probability.filter(|p| *p > 0.0).map(|p| match side {
            Side::No => 1.0 - p,
            _ => p,
        });
        let (size, contracts) = extract_size_contracts(text);
        let horizon = extract_resolution_time(text);

        let signal = |market_ref: String| {
            let mut s = ParsedSignal::new(AssetClass::Prediction, side)
                .with_confidence(confidence)
                .with_aux("raw_text", raw_text(text));
            s.market_ref = Some(market_ref);
            s.horizon_seconds = horizon;
            s
        };

        let mut primary = signal(found.market_ref.clone()).with_meta(SignalMeta::Prediction(
            PredictionMeta {
                platform: found.platform,
                probability,
                contracts,
                category: detect_category(text).map(str::to_string),
            },
        ));
        primary.size = size;

        let mut signals = vec![primary];
        signals.extend(
            self.all_refs(text)
                .into_iter()
                .filter(|r| *r != found.market_ref)
                .map(signal),
        );
        signals
    }
}

/// Stable reference for a post that talks about a market without linking it.
pub fn synthetic_market_ref(text: &str) -> String {
    let prefix: String = text.chars().take(SYNTHETIC_REF_CHARS).collect();
    format!("inferred_{}", &hash_text(&prefix)[..12])
}

pub fn extract_position(text: &str) -> Option<Side> {
    let lower = text.to_lowercase();
    let score = |terms: &[&str], boosted: [&str; 2]| {
        terms
            .iter()
            .filter(|t| lower.contains(*t))
            .map(|t| if boosted.contains(t) { 3 } else { 1 })
            .sum::<u32>()
    };
    let mut yes = score(&YES_TERMS, ["buy yes", "long yes"]);
    let mut no = score(&NO_TERMS, ["buy no", "long no"]);

    if let Some(pct) = ANY_PERCENT.captures(text).and_then(|c| parse_number(&c[1])) {
        if pct > 60.0 {
            yes += 1;
        } else if pct < 40.0 {
            no += 1;
        }
    }
    if ["✅", "👍", "🟢"].iter().any(|e| text.contains(e)) {
        yes += 1;
    }
    if ["❌", "👎", "🔴"].iter().any(|e| text.contains(e)) {
        no += 1;
    }

    match yes.cmp(&no) {
        std::cmp::Ordering::Greater => Some(Side::Yes),
        std::cmp::Ordering::Less => Some(Side::No),
        std::cmp::Ordering::Equal => None,
    }
}

/// Stated probability of YES in [0, 1]: numeric patterns first, then phrases.
/// A number that scales outside [0, 1] is skipped.
pub fn extract_probability(text: &str) -> Option<f64> {
    for (re, scale) in PROBABILITY.iter() {
        let Some(value) = re.captures(text).and_then(|c| parse_number(&c[1])) else {
            continue;
        };
        let p = match scale {
            Scale::Cents => value / 100.0,
            Scale::Percent if value > 1.0 => value / 100.0,
            Scale::Percent => value,
        };
        if (0.0..=1.0).contains(&p) {
            return Some(p);
        }
    }
    let lower = text.to_lowercase();
    QUALITATIVE_PROBABILITY
        .iter()
        .find(|(phrase, _)| lower.contains(phrase))
        .map(|(_, p)| *p)
}

/// Dollar size and contract count. A bare contract count implies a size.
pub fn extract_size_contracts(text: &str) -> (Option<f64>, Option<f64>) {
    let mut size = None;
    let mut contracts = None;
    for (re, stake) in STAKE.iter() {
        let Some(value) = re.captures(text).and_then(|c| parse_number(&c[1])) else {
            continue;
        };
        match stake {
            Stake::Dollars => size = Some(value),
            Stake::Contracts => contracts = Some(value),
        }
        if value != 0.0 {
            break;
        }
    }
    if let (None, Some(n)) = (size, contracts.filter(|n| *n != 0.0)) {
        size = Some(n * CONTRACT_PRICE_ESTIMATE);
    }
    (size, contracts)
}

pub fn extract_resolution_time(text: &str) -> Option<i64> {
    let lower = text.to_lowercase();
    if let Some(secs) = RESOLUTION
        .iter()
        .filter(|(re, _)| re.is_match(&lower))
        .find_map(|(_, secs)| *secs)
    {
        return Some(secs);
    }
    if lower.contains("election") {
        if text.contains("2024") {
            return Some(YEAR);
        }
        if lower.contains("primary") {
            return Some(QUARTER);
        }
    }
    None
}

/// Category with the most keyword hits; earlier categories win ties.
pub fn detect_category(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let mut best: Option<(&'static str, usize)> = None;
    for (category, keywords) in CATEGORIES {
        let score = keywords.iter().filter(|k| lower.contains(*k)).count();
        if score > 0 && best.is_none_or(|(_, top)| score > top) {
            best = Some((category, score));
        }
    }
    best.map(|(category, _)| category)
}
