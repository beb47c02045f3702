use std::sync::LazyLock;

use common::types::{AssetClass, EquityMeta, ParsedSignal, Side, SignalMeta};
use regex::Regex;

use super::{raw_text, SignalParser};
use crate::text::{compile_all, first_capture, parse_number};
use crate::timeframe::{DAY, MONTH, QUARTER, WEEK, YEAR};

const TICKER_ALT: &str = r"\b([A-Z]{2,5})\b(?:\s+(?:calls?|puts?|shares?|stock))?";

const BUY_PATTERNS: [&str; 3] = [
    r"(?:buy|long|bought|buying|accumulate|bullish|add(?:ing)?)\s+(?:on\s+)?",
    r"(?:entry|enter(?:ed|ing)?|position)\s+(?:at|in|on)\s+",
    r"(?:target|pt|price\s+target)[:=\s]+\$?(\d+(?:\.\d+)?)",
];

const SELL_PATTERNS: [&str; 3] = [
    r"(?:sell|short|sold|selling|dump|bearish|exit(?:ed|ing)?)\s+(?:on\s+)?",
    r"(?:close|closing|closed)\s+(?:position|trade)\s+(?:in|on)\s+",
    r"(?:stop|sl|stop\s+loss)[:=\s]+\$?(\d+(?:\.\d+)?)",
];

const TICKER_STOPWORDS: [&str; 9] = [
    "THE", "AND", "FOR", "WITH", "FROM", "THIS", "THAT", "USA", "CEO",
];

static DOLLAR_TICKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\$([A-Z]{1,5})\b").unwrap());
static DOLLAR_TICKER_STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Z]{1,5})\b").unwrap());
static UPPERCASE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2,5})\b").unwrap());

/// Action pattern followed by a ticker-shaped word, buy patterns first.
static CONTEXT_TICKER: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BUY_PATTERNS
        .iter()
        .chain(SELL_PATTERNS.iter())
        .map(|p| Regex::new(&format!("(?i){p}{TICKER_ALT}")).unwrap())
        .collect()
});

static BUY: LazyLock<Vec<Regex>> = LazyLock::new(|| compile_all(&BUY_PATTERNS));
static SELL: LazyLock<Vec<Regex>> = LazyLock::new(|| compile_all(&SELL_PATTERNS));
static STATED_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:pt|target|tp)[:=\s]+\$?\d+").unwrap());

enum Conviction {
    Percent,
    Fixed(f64),
}

static CONFIDENCE: LazyLock<Vec<(Regex, Conviction)>> = LazyLock::new(|| {
    [
        (r"(\d+)%\s+(?:confidence|conviction|certain|sure)", Conviction::Percent),
        (r"(?:very\s+)?(?:high|strong)\s+(?:confidence|conviction)", Conviction::Fixed(0.85)),
        (r"(?:medium|moderate)\s+(?:confidence|conviction)", Conviction::Fixed(0.65)),
        (r"(?:low|weak)\s+(?:confidence|conviction)", Conviction::Fixed(0.35)),
        (r"(?:starter|small)\s+(?:position|size)", Conviction::Fixed(0.40)),
        (r"(?:full|large)\s+(?:position|size)", Conviction::Fixed(0.80)),
    ]
    .into_iter()
    .map(|(p, c)| (Regex::new(p).unwrap(), c))
    .collect()
});

static HORIZON: LazyLock<Vec<(Regex, i64)>> = LazyLock::new(|| {
    [
        (r"(?:day|intraday)\s+trade", DAY),
        (r"(?:swing|week)\s+trade", WEEK),
        (r"(?:monthly?|30\s*day)", MONTH),
        (r"(?:quarterly?|90\s*day|3\s*month)", QUARTER),
        (r"(?:yearly?|annual|12\s*month)", YEAR),
        (r"(?:by|before|until)\s+(?:eod|close)", 28_800),
    ]
    .into_iter()
    .map(|(p, secs)| (Regex::new(p).unwrap(), secs))
    .collect()
});
static BY_WEEKDAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"by\s+(monday|tuesday|wednesday|thursday|friday)").unwrap());

static TARGET: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?i)(?:pt|target|tp)[:=\s]+\$?(\d+(?:\.\d+)?)",
        r"(?i)\$?(\d+(?:\.\d+)?)\s+(?:target|pt)",
        r"(?i)(?:see(?:ing)?|expect(?:ing)?)\s+\$?(\d+(?:\.\d+)?)",
    ])
});
static STOP: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?i)(?:stop|sl|stop\s+loss)[:=\s]+\$?(\d+(?:\.\d+)?)",
        r"(?i)(?:risk|risking)\s+(?:to|at)\s+\$?(\d+(?:\.\d+)?)",
    ])
});
static ENTRY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?i)(?:entry|enter|buy|long)\s+(?:at|@|around)\s+\$?(\d+(?:\.\d+)?)",
        r"(?i)(?:bought|entered)\s+(?:at|@)\s+\$?(\d+(?:\.\d+)?)",
        r"(?i)\$?(\d+(?:\.\d+)?)\s+(?:entry|buy|long)\b",
        r"(?i)(?:entry|enter)[:=\s]+\$?(\d+(?:\.\d+)?)",
    ])
});

static SIZE_PCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*%\s+(?:of\s+)?(?:portfolio|account|capital)").unwrap()
});
static SIZE_DOLLARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+(?:,\d{3})*(?:\.\d+)?)([kmb])?\b").unwrap());
static SIZE_SHARES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:,\d{3})*)\s+(?:shares?|stocks?)").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct EquityParser;

impl SignalParser for EquityParser {
    fn asset_class(&self) -> AssetClass {
        AssetClass::Equity
    }

    fn parse(&self, text: &str) -> Vec<ParsedSignal> {
        let Some(ticker) = extract_ticker(text) else {
            return Vec::new();
        };

        let side = match extract_side(text) {
            Some(side) => side,
            // A bare cashtag mention reads as a long idea.
            None if text.contains(&format!("${ticker}")) => Side::Long,
            None => return Vec::new(),
        };

        let confidence = extract_confidence(text);
        let horizon = extract_horizon(text);
        let size = extract_size(text);
        let meta = EquityMeta {
            entry_price: first_capture(&ENTRY, text).and_then(parse_number),
            target_price: first_capture(&TARGET, text).and_then(parse_number),
            stop_price: first_capture(&STOP, text).and_then(parse_number),
        };

        let signal = |instrument: String| {
            let mut s = ParsedSignal::new(AssetClass::Equity, side)
                .with_confidence(confidence)
                .with_aux("raw_text", raw_text(text));
            s.instrument = Some(instrument);
            s.horizon_seconds = horizon;
            s.size = size;
            s
        };

        let mut signals = vec![signal(ticker.clone()).with_meta(SignalMeta::Equity(meta))];

        let mut seen = vec![ticker];
        for caps in DOLLAR_TICKER_STRICT.captures_iter(text) {
            let other = caps[1].to_string();
            if !seen.contains(&other) {
                signals.push(signal(other.clone()));
                seen.push(other);
            }
        }
        signals
    }
}

/// Most prominent ticker: a cashtag, else a ticker-shaped word after an
/// action phrase, else the first all-caps word (unless it is a common word).
pub fn extract_ticker(text: &str) -> Option<String> {
    if let Some(c) = DOLLAR_TICKER.captures(text) {
        return Some(c[1].to_ascii_uppercase());
    }

    for re in CONTEXT_TICKER.iter() {
        if let Some(m) = re.captures(text).and_then(|c| c.iter().flatten().last()) {
            let ticker = m.as_str();
            if (2..=5).contains(&ticker.len()) {
                return Some(ticker.to_ascii_uppercase());
            }
        }
    }

    let word = UPPERCASE_WORD.captures(text)?.get(1)?.as_str();
    (!TICKER_STOPWORDS.contains(&word)).then(|| word.to_string())
}

pub fn extract_side(text: &str) -> Option<Side> {
    let lower = text.to_lowercase();

    let mut buy = BUY.iter().filter(|re| re.is_match(&lower)).count();
    let mut sell = SELL.iter().filter(|re| re.is_match(&lower)).count();

    if ["bullish", "long", "buy", "bought", "accumulate"]
        .iter()
        .any(|w| lower.contains(w))
    {
        buy += 2;
    }
    if ["bearish", "short", "sell", "sold", "dump"]
        .iter()
        .any(|w| lower.contains(w))
    {
        sell += 2;
    }
    if lower.contains("call") {
        buy += 1;
    }
    if lower.contains("put") {
        sell += 1;
    }

    match buy.cmp(&sell) {
        std::cmp::Ordering::Greater => Some(Side::Long),
        std::cmp::Ordering::Less => Some(Side::Short),
        // A stated price target breaks the tie toward long.
        std::cmp::Ordering::Equal => STATED_TARGET.is_match(&lower).then_some(Side::Long),
    }
}

pub fn extract_confidence(text: &str) -> Option<f64> {
    let lower = text.to_lowercase();

    for (re, conviction) in CONFIDENCE.iter() {
        if let Some(c) = re.captures(&lower) {
            return match conviction {
                Conviction::Percent => c[1].parse::<f64>().ok().map(|n| n / 100.0),
                Conviction::Fixed(v) => Some(*v),
            };
        }
    }

    if lower.contains("starter") || lower.contains("small position") {
        return Some(0.40);
    }
    if lower.contains("full position") || lower.contains("all in") {
        return Some(0.85);
    }

    let hedging = ["maybe", "perhaps", "might", "could", "possibly"]
        .iter()
        .filter(|w| lower.contains(*w))
        .count();
    let strong = ["definitely", "certainly", "surely", "absolutely"]
        .iter()
        .filter(|w| lower.contains(*w))
        .count();
    match strong.cmp(&hedging) {
        std::cmp::Ordering::Greater => Some(0.75),
        std::cmp::Ordering::Less => Some(0.45),
        std::cmp::Ordering::Equal => None,
    }
}

pub fn extract_horizon(text: &str) -> Option<i64> {
    let lower = text.to_lowercase();

    if let Some((_, secs)) = HORIZON.iter().find(|(re, _)| re.is_match(&lower)) {
        return Some(*secs);
    }
    if BY_WEEKDAY.is_match(&lower) {
        return Some(3 * DAY);
    }
    if lower.contains("today") || lower.contains("intraday") {
        return Some(DAY);
    }
    if lower.contains("this week") {
        return Some(WEEK);
    }
    None
}

/// Position size: fraction of portfolio, dollar amount (k/m/b suffix), or share count.
pub fn extract_size(text: &str) -> Option<f64> {
    let lower = text.to_lowercase();

    if let Some(c) = SIZE_PCT.captures(&lower) {
        return parse_number(&c[1]).map(|pct| pct / 100.0);
    }
    if let Some(c) = SIZE_DOLLARS.captures(&lower) {
        let amount = parse_number(&c[1])?;
        let multiplier = match c.get(2).map(|m| m.as_str()) {
            Some("k") => 1e3,
            Some("m") => 1e6,
            Some("b") => 1e9,
            _ => 1.0,
        };
        return Some(amount * multiplier);
    }
    SIZE_SHARES
        .captures(&lower)
        .and_then(|c| parse_number(&c[1]))
}
