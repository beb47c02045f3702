//! Stateless text primitives shared by the parsers. Nothing here fails on
//! ordinary text; absence of a match is an empty result.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static MENTION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(\w+)").unwrap());
static HASHTAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(\w+)").unwrap());
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).unwrap());
static DOLLAR_TICKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Z]{1,6})\b").unwrap());
static CONTEXT_TICKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:buy|sell|long|short|bullish|bearish)\s+([A-Z]{2,5})\b").unwrap()
});
static CASHTAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$([A-Z]{1,6})").unwrap());
static STATED_CONFIDENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)%\s*(?:confidence|sure|certain)").unwrap());

static RR_RATIO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?):(\d+(?:\.\d+)?)\s*(?:rr|risk\s*reward)").unwrap()
});
static RR_STOP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:sl|stop)\s*[:=]?\s*\$?(\d+(?:\.\d+)?)").unwrap());
static RR_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:tp|target|pt)\s*[:=]?\s*\$?(\d+(?:\.\d+)?)").unwrap());
static RR_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:entry|buy|long)\s*[:=@]?\s*\$?(\d+(?:\.\d+)?)").unwrap());

/// Category keyword patterns, scored in this order; ties go to the earlier category.
static CATEGORY_PATTERNS: LazyLock<Vec<(&'static str, Vec<Regex>)>> = LazyLock::new(|| {
    vec![
        (
            "equity",
            compile_all(&[
                r"\$[A-Z]{1,5}\b",
                r"(?i)(?:buy|sell|long|short|calls?|puts?)",
                r"(?i)(?:pt|target|stop|sl)[:=]\s*\$?\d+",
            ]),
        ),
        (
            "crypto",
            compile_all(&[
                r"(?i)\$(?:BTC|ETH|SOL|AVAX|ARB|OP|INJ|TIA)",
                r"(?i)(?:leverage|perp|futures|spot)",
                r"(?i)(?:moon|pump|dump|hodl)",
            ]),
        ),
        (
            "prediction",
            compile_all(&[
                r"(?i)(?:polymarket|manifold|metaculus|kalshi)",
                r"(?i)(?:yes|no)\s+(?:at|@)\s*\d+[c%]",
                r"(?i)(?:bet|wager|position)",
            ]),
        ),
        (
            "sports",
            compile_all(&[
                r"(?i)(?:nfl|nba|mlb|nhl|ncaa)",
                r"(?i)[\+\-]\d+(?:\.\d)?(?:\s+units?)?",
                r"(?i)(?:over|under|spread|ml|moneyline)",
            ]),
        ),
    ]
});

const TICKER_STOPWORDS: [&str; 8] = ["THE", "AND", "FOR", "NOT", "ALL", "NEW", "GET", "SET"];

const KNOWN_CRYPTO: [&str; 13] = [
    "BTC", "ETH", "BNB", "SOL", "ADA", "DOGE", "XRP", "DOT", "MATIC", "LINK", "UNI", "AVAX",
    "ATOM",
];
const FOREX_CODES: [&str; 7] = ["EUR", "GBP", "JPY", "USD", "CAD", "AUD", "CHF"];

const BULLISH_EMOJI: [&str; 10] = ["🚀", "🌙", "📈", "💚", "🟢", "⬆️", "🔥", "💪", "🎯", "✅"];
const BEARISH_EMOJI: [&str; 9] = ["📉", "🔴", "❌", "⬇️", "💔", "🩸", "😱", "⚠️", "🐻"];
const NEUTRAL_EMOJI: [&str; 7] = ["🤔", "😐", "🤷", "📊", "💭", "⏳", "👀"];

const STRONG_PHRASES: [&str; 13] = [
    "definitely",
    "certainly",
    "absolutely",
    "guaranteed",
    "lock",
    "slam dunk",
    "can't miss",
    "sure thing",
    "max bet",
    "all in",
    "hammer",
    "pound",
    "love",
];
const MODERATE_PHRASES: [&str; 8] = [
    "probably",
    "likely",
    "should",
    "expect",
    "confident",
    "bullish",
    "like",
    "decent",
];
const HEDGING_PHRASES: [&str; 10] = [
    "maybe", "perhaps", "might", "could", "possibly", "risky", "careful", "small", "starter",
    "nibble",
];

/// Compile an ordered pattern list. Patterns are compile-time constants.
pub(crate) fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

/// First capture group of the first pattern (in list order) that matches.
pub(crate) fn first_capture<'t>(patterns: &[Regex], text: &'t str) -> Option<&'t str> {
    patterns
        .iter()
        .find_map(|re| re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str()))
}

/// Parse a numeric literal that may carry thousands separators.
pub(crate) fn parse_number(s: &str) -> Option<f64> {
    s.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// True when `word` occurs in `haystack` delimited by non-word characters.
/// Both sides are expected to be lowercased already.
pub fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(word).any(|(start, _)| {
        let before_ok = haystack[..start].chars().next_back().is_none_or(|c| !is_word(c));
        let after_ok = haystack[start + word.len()..]
            .chars()
            .next()
            .is_none_or(|c| !is_word(c));
        before_ok && after_ok
    })
}

pub fn clean_text(text: &str) -> String {
    WHITESPACE
        .replace_all(text, " ")
        .trim()
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

pub fn extract_mentions(text: &str) -> Vec<String> {
    MENTION.captures_iter(text).map(|c| c[1].to_string()).collect()
}

pub fn extract_hashtags(text: &str) -> Vec<String> {
    HASHTAG.captures_iter(text).map(|c| c[1].to_string()).collect()
}

pub fn extract_urls(text: &str) -> Vec<String> {
    URL.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Cashtags followed by keyword-context tickers, deduplicated in first-seen order.
pub fn extract_tickers(text: &str) -> Vec<String> {
    let dollar = DOLLAR_TICKER.captures_iter(text).map(|c| c[1].to_string());
    let context = CONTEXT_TICKER
        .captures_iter(text)
        .map(|c| c[1].to_ascii_uppercase());

    let mut out: Vec<String> = Vec::new();
    for t in dollar.chain(context) {
        if !TICKER_STOPWORDS.contains(&t.as_str()) && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

/// Qualitative confidence in [0, 1] from wording; an explicit "N% sure" overrides.
pub fn confidence_from_language(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let mut confidence: f64 = 0.5;

    if STRONG_PHRASES.iter().any(|p| lower.contains(p)) {
        confidence = confidence.max(0.85);
    }
    if MODERATE_PHRASES.iter().any(|p| lower.contains(p)) {
        confidence = confidence.max(0.65);
    }
    if HEDGING_PHRASES.iter().any(|p| lower.contains(p)) {
        confidence = confidence.min(0.40);
    }

    if let Some(n) = STATED_CONFIDENCE
        .captures(&lower)
        .and_then(|c| c[1].parse::<f64>().ok())
    {
        confidence = n / 100.0;
    }
    confidence.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CashtagBuckets {
    pub stocks: Vec<String>,
    pub crypto: Vec<String>,
    pub forex: Vec<String>,
    pub unknown: Vec<String>,
}

pub fn tokenize_cashtags(text: &str) -> CashtagBuckets {
    let mut buckets = CashtagBuckets::default();
    for c in CASHTAG.captures_iter(text) {
        let tag = c[1].to_string();
        if KNOWN_CRYPTO.contains(&tag.as_str()) {
            buckets.crypto.push(tag);
        } else if FOREX_CODES.iter().any(|fx| tag.contains(fx)) {
            buckets.forex.push(tag);
        } else if tag.len() <= 4 {
            buckets.stocks.push(tag);
        } else {
            buckets.unknown.push(tag);
        }
    }
    buckets
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmojiSentiment {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

pub fn sentiment_emoji(text: &str) -> EmojiSentiment {
    let count = |set: &[&str]| set.iter().map(|e| text.matches(e).count()).sum();
    EmojiSentiment {
        bullish: count(&BULLISH_EMOJI),
        bearish: count(&BEARISH_EMOJI),
        neutral: count(&NEUTRAL_EMOJI),
    }
}

/// First 16 hex chars of SHA-256, used as a content fingerprint.
pub fn hash_text(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// `(risk, reward)` from an explicit "1:3 rr", else `(1, reward/risk)` from
/// stated entry, stop and target levels.
pub fn extract_risk_reward(text: &str) -> Option<(f64, f64)> {
    let lower = text.to_lowercase();
    if let Some(c) = RR_RATIO.captures(&lower) {
        return Some((parse_number(&c[1])?, parse_number(&c[2])?));
    }

    let level = |re: &Regex| re.captures(&lower).and_then(|c| parse_number(&c[1]));
    let (stop, target, entry) = (level(&RR_STOP)?, level(&RR_TARGET)?, level(&RR_ENTRY)?);
    let risk = (entry - stop).abs();
    let reward = (target - entry).abs();
    (risk > 0.0).then(|| (1.0, reward / risk))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalQuality {
    High,
    Medium,
    Low,
}

impl SignalQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

pub fn classify_signal_quality(text: &str) -> SignalQuality {
    static HAS_TICKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$[A-Z]{1,6}").unwrap());
    static HAS_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());
    static HAS_ACTION: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?:entry|buy|sell|long|short)").unwrap());
    static HAS_LEVELS: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?:tp|target|pt|sl|stop)").unwrap());
    static HAS_CONFIDENCE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?:\d+%|confidence|conviction)").unwrap());

    let lower = text.to_lowercase();
    let mut score = 0;
    if HAS_TICKER.is_match(text) {
        score += 1;
    }
    if HAS_NUMBER.is_match(text) {
        score += 1;
    }
    if HAS_ACTION.is_match(&lower) {
        score += 1;
    }
    if HAS_LEVELS.is_match(&lower) {
        score += 2;
    }
    if HAS_CONFIDENCE.is_match(&lower) {
        score += 1;
    }
    if text.chars().count() > 50 {
        score += 1;
    }

    match score {
        s if s >= 5 => SignalQuality::High,
        s if s >= 3 => SignalQuality::Medium,
        _ => SignalQuality::Low,
    }
}

/// Coarse post category: equity, crypto, prediction, sports, or general.
pub fn detect_post_category(text: &str) -> &'static str {
    let mut best = ("general", 0_usize);
    for (category, patterns) in CATEGORY_PATTERNS.iter() {
        let score = patterns.iter().filter(|re| re.is_match(text)).count();
        if score > best.1 {
            best = (*category, score);
        }
    }
    best.0
}
