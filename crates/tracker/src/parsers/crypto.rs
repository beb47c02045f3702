use std::sync::{Arc, LazyLock};

use common::types::{AssetClass, CryptoMeta, ParsedSignal, Side, SignalMeta};
use regex::Regex;

use super::{raw_text, ParserTables, SignalParser};
use crate::text::{compile_all, contains_word, first_capture, parse_number};
use crate::timeframe::{DAY, MONTH, QUARTER, WEEK, YEAR};

const STABLECOINS: [&str; 4] = ["USDT", "USDC", "BUSD", "DAI"];
const NOT_A_SYMBOL: [&str; 6] = ["THE", "AND", "FOR", "USD", "USDT", "USDC"];

static DOLLAR_SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\$([A-Z]{2,6})\b").unwrap());
static DOLLAR_SYMBOL_STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Z]{2,6})\b").unwrap());
static UPPERCASE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2,6})\b").unwrap());

static LEVERAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)[xX]\s*(?:leverage|lev)").unwrap());
static MARGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:isolated|cross)\s*margin\b").unwrap());
static PERP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:perp|perpetual)\b").unwrap());
static FUTURES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bfutures?\b").unwrap());
static SPOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bspot\b").unwrap());

static ENTRY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?i)(?:entry|buy|long|short)\s*(?:at|@|:)?\s*\$?(\d+(?:,\d{3})*(?:\.\d+)?)",
        r"(?i)(?:bought|entered|longed|shorted)\s*(?:at|@)?\s*\$?(\d+(?:,\d{3})*(?:\.\d+)?)",
        r"(?i)\$?(\d+(?:,\d{3})*(?:\.\d+)?)\s*(?:entry|buy)",
    ])
});
static TAKE_PROFIT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?i)(?:tp|take\s*profit|target|pt)(?:\s*\d+)?\s*(?:at|@|:)?\s*\$?(\d+(?:,\d{3})*(?:\.\d+)?)",
        r"(?i)\$?(\d+(?:,\d{3})*(?:\.\d+)?)\s*(?:target|tp)",
    ])
});
static STOP_LOSS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile_all(&[
        r"(?i)(?:sl|stop\s*loss|stop)\s*(?:at|@|:)?\s*\$?(\d+(?:,\d{3})*(?:\.\d+)?)",
        r"(?i)(?:risk|risking)\s*(?:to|at)\s*\$?(\d+(?:,\d{3})*(?:\.\d+)?)",
        r"(?i)(?:invalidation)\s*(?:at|@|:)?\s*\$?(\d+(?:,\d{3})*(?:\.\d+)?)",
    ])
});

static SIZE_PCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*%\s*(?:of\s+)?(?:portfolio|account|capital|allocation)")
        .unwrap()
});
static SIZE_DOLLARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(\d+(?:,\d{3})*(?:\.\d+)?)\s*([kmb])?(?:\s+|$)").unwrap()
});
static SIZE_STABLES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:,\d{3})*(?:\.\d+)?)\s*(?:usd|usdt|usdc|busd)").unwrap()
});

enum Stated {
    Percent,
    Fixed(f64),
}

static CONFIDENCE: LazyLock<Vec<(Regex, Stated)>> = LazyLock::new(|| {
    [
        (r"(\d+)\s*%\s*(?:confidence|conviction|certain|sure)", Stated::Percent),
        (
            r"(?:very\s+)?(?:high|strong|bullish)\s+(?:confidence|conviction)?",
            Stated::Fixed(0.85),
        ),
        (r"(?:medium|moderate|neutral)", Stated::Fixed(0.60)),
        (r"(?:low|weak|bearish)\s+(?:confidence|conviction)?", Stated::Fixed(0.35)),
        (r"(?:moon|ape|yolo|all\s*in)", Stated::Fixed(0.95)),
        (r"(?:dca|accumulate|nibble)", Stated::Fixed(0.50)),
    ]
    .into_iter()
    .map(|(p, s)| (Regex::new(p).unwrap(), s))
    .collect()
});

static TIMEFRAME: LazyLock<Vec<(Regex, i64)>> = LazyLock::new(|| {
    [
        (r"(?:scalp|1m|5m|15m)", 900),
        (r"(?:intraday|day\s*trade|today)", DAY),
        (r"(?:swing|weekly?|1w)", WEEK),
        (r"(?:monthly?|30d|1m)", MONTH),
        (r"(?:quarterly?|90d|3m)", QUARTER),
        (r"(?:long\s*term|yearly?|hodl)", YEAR),
    ]
    .into_iter()
    .map(|(p, secs)| (Regex::new(p).unwrap(), secs))
    .collect()
});

const LONG_WORDS: [&str; 9] = [
    "long",
    "buy",
    "bought",
    "bullish",
    "moon",
    "pump",
    "accumulate",
    "hodl",
    "bid",
];
const SHORT_WORDS: [&str; 8] = [
    "short", "sell", "sold", "bearish", "dump", "fade", "puts", "hedge",
];
const LONG_EMOJI: [&str; 5] = ["🚀", "🌙", "📈", "💚", "🟢"];
const SHORT_EMOJI: [&str; 4] = ["📉", "🔴", "🩸", "💔"];

pub struct CryptoParser {
    tables: Arc<ParserTables>,
}

impl CryptoParser {
    pub fn new(tables: Arc<ParserTables>) -> Self {
        Self { tables }
    }

    /// Primary symbol: a cashtag, else a known name or alias (table order),
    /// else the first plausible all-caps word.
    pub fn normalize_symbol(&self, text: &str) -> Option<String> {
        if let Some(c) = DOLLAR_SYMBOL.captures(text) {
            let symbol = c[1].to_ascii_uppercase();
            if self.tables.is_crypto_symbol(&symbol) || symbol.len() <= 5 {
                return Some(symbol);
            }
        }

        let lower = text.to_lowercase();
        if let Some(symbol) = self.named_symbols(&lower).next() {
            return Some(symbol.to_string());
        }

        UPPERCASE_WORD
            .captures_iter(text)
            .map(|c| c.get(1).map_or("", |m| m.as_str()))
            .find(|word| {
                self.tables.is_crypto_symbol(word)
                    || (word.len() <= 5 && !NOT_A_SYMBOL.contains(word))
            })
            .map(str::to_string)
    }

    fn named_symbols<'a>(&'a self, lower: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tables
            .crypto_symbols
            .iter()
            .filter(move |(_, names)| names.iter().any(|n| contains_word(lower, n)))
            .map(|(symbol, _)| symbol.as_str())
    }
}

impl SignalParser for CryptoParser {
    fn asset_class(&self) -> AssetClass {
        AssetClass::Crypto
    }

    fn parse(&self, text: &str) -> Vec<ParsedSignal> {
        let Some(symbol) = self.normalize_symbol(text) else {
            return Vec::new();
        };

        let trading_type = extract_trading_type(text);
        let side = extract_side(text);
        let confidence = extract_confidence(text);
        let horizon = extract_timeframe(text);
        let take_profits = extract_take_profits(text);
        let meta = CryptoMeta {
            trading_type: Some(trading_type.to_string()),
            leverage: extract_leverage(text),
            entry: first_capture(&ENTRY, text).and_then(parse_number),
            target: take_profits.first().copied(),
            take_profits: sorted(take_profits),
            stop_loss: first_capture(&STOP_LOSS, text).and_then(parse_number),
        };

        let signal = |instrument: String| {
            let mut s = ParsedSignal::new(AssetClass::Crypto, side)
                .with_confidence(confidence)
                .with_aux("raw_text", raw_text(text));
            s.instrument = Some(instrument);
            s.horizon_seconds = horizon;
            s
        };

        let instrument = if STABLECOINS.contains(&symbol.as_str()) {
            symbol.clone()
        } else {
            format!("{symbol}-USD")
        };
        let mut primary = signal(instrument).with_meta(SignalMeta::Crypto(meta));
        primary.size = extract_size(text);
        let mut signals = vec![primary];

        // Secondary mentions: cashtags in order, then names in table order.
        let lower = text.to_lowercase();
        let mut mentioned: Vec<String> = Vec::new();
        let cashtags = DOLLAR_SYMBOL_STRICT
            .captures_iter(text)
            .map(|c| c[1].to_string());
        let named = self.named_symbols(&lower).map(str::to_string);
        for other in cashtags.chain(named) {
            if other != symbol
                && !["USDT", "USDC", "USD"].contains(&other.as_str())
                && !mentioned.contains(&other)
            {
                mentioned.push(other);
            }
        }
        for other in mentioned {
            let secondary = signal(format!("{other}-USD")).with_meta(SignalMeta::Crypto(CryptoMeta {
                trading_type: Some(trading_type.to_string()),
                ..CryptoMeta::default()
            }));
            signals.push(secondary);
        }
        signals
    }
}

pub fn extract_trading_type(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if PERP.is_match(&lower) {
        "perpetual"
    } else if FUTURES.is_match(&lower) {
        "futures"
    } else if SPOT.is_match(&lower) {
        "spot"
    } else if LEVERAGE.is_match(&lower) {
        "perpetual"
    } else {
        "spot"
    }
}

pub fn extract_leverage(text: &str) -> Option<f64> {
    if let Some(c) = LEVERAGE.captures(text) {
        return parse_number(&c[1]);
    }
    MARGIN.is_match(&text.to_lowercase()).then_some(2.0)
}

/// Every take-profit level, deduplicated, in order found (pattern by pattern).
pub fn extract_take_profits(text: &str) -> Vec<f64> {
    let mut levels: Vec<f64> = Vec::new();
    for re in TAKE_PROFIT.iter() {
        for c in re.captures_iter(text) {
            if let Some(tp) = parse_number(&c[1]) {
                if !levels.iter().any(|l| (l - tp).abs() < f64::EPSILON) {
                    levels.push(tp);
                }
            }
        }
    }
    levels
}

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
    SIZE_STABLES
        .captures(&lower)
        .and_then(|c| parse_number(&c[1]))
}

pub fn extract_confidence(text: &str) -> Option<f64> {
    let lower = text.to_lowercase();
    CONFIDENCE.iter().find_map(|(re, stated)| {
        let c = re.captures(&lower)?;
        match stated {
            Stated::Percent => c[1].parse::<f64>().ok().map(|n| n / 100.0),
            Stated::Fixed(v) => Some(*v),
        }
    })
}

pub fn extract_timeframe(text: &str) -> Option<i64> {
    let lower = text.to_lowercase();
    TIMEFRAME
        .iter()
        .find(|(re, _)| re.is_match(&lower))
        .map(|(_, secs)| *secs)
}

/// Long unless short vocabulary strictly outweighs long vocabulary.
pub fn extract_side(text: &str) -> Side {
    let lower = text.to_lowercase();
    let mut long = LONG_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let mut short = SHORT_WORDS.iter().filter(|w| lower.contains(*w)).count();
    if LONG_EMOJI.iter().any(|e| text.contains(e)) {
        long += 1;
    }
    if SHORT_EMOJI.iter().any(|e| text.contains(e)) {
        short += 1;
    }
    if short > long {
        Side::Short
    } else {
        Side::Long
    }
}

fn sorted(mut levels: Vec<f64>) -> Vec<f64> {
    levels.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    levels
}
