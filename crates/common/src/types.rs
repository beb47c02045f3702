use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Crypto,
    Prediction,
    Sports,
}

impl AssetClass {
    pub const ALL: [AssetClass; 4] = [
        AssetClass::Equity,
        AssetClass::Crypto,
        AssetClass::Prediction,
        AssetClass::Sports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equity => "equity",
            Self::Crypto => "crypto",
            Self::Prediction => "prediction",
            Self::Sports => "sports",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equity" => Ok(Self::Equity),
            "crypto" => Ok(Self::Crypto),
            "prediction" => Ok(Self::Prediction),
            "sports" => Ok(Self::Sports),
            other => Err(InputError::InvalidValue {
                field: "asset_class",
                value: other.to_string(),
            }),
        }
    }
}

/// Direction of a signal. Which variants are legal depends on the asset class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
    Yes,
    No,
    Over,
    Under,
    Favorite,
    Underdog,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
            Self::Yes => "yes",
            Self::No => "no",
            Self::Over => "over",
            Self::Under => "under",
            Self::Favorite => "favorite",
            Self::Underdog => "underdog",
        }
    }

    pub fn is_valid_for(&self, asset_class: AssetClass) -> bool {
        match asset_class {
            AssetClass::Equity | AssetClass::Crypto => matches!(self, Self::Long | Self::Short),
            AssetClass::Prediction => matches!(self, Self::Yes | Self::No),
            AssetClass::Sports => matches!(
                self,
                Self::Over | Self::Under | Self::Favorite | Self::Underdog
            ),
        }
    }
}

impl FromStr for Side {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "long" => Ok(Self::Long),
            "short" => Ok(Self::Short),
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            "over" => Ok(Self::Over),
            "under" => Ok(Self::Under),
            "favorite" => Ok(Self::Favorite),
            "underdog" => Ok(Self::Underdog),
            other => Err(InputError::InvalidValue {
                field: "side",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    Spread,
    Total,
    Moneyline,
}

impl LineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spread => "spread",
            Self::Total => "total",
            Self::Moneyline => "moneyline",
        }
    }
}

impl FromStr for LineType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Line feeds abbreviate moneyline as "ml".
        match s.to_ascii_lowercase().as_str() {
            "spread" => Ok(Self::Spread),
            "total" => Ok(Self::Total),
            "moneyline" | "ml" => Ok(Self::Moneyline),
            _ => Err(InputError::InvalidValue {
                field: "line_type",
                value: s.to_string(),
            }),
        }
    }
}

/// Equity extraction: price levels quoted in the post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityMeta {
    pub entry_price: Option<f64>,
    pub target_price: Option<f64>,
    pub stop_price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CryptoMeta {
    pub trading_type: Option<String>,
    pub leverage: Option<f64>,
    pub entry: Option<f64>,
    pub target: Option<f64>,
    #[serde(default)]
    pub take_profits: Vec<f64>,
    pub stop_loss: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionMeta {
    pub platform: Option<String>,
    /// Stated probability of YES, in [0, 1].
    pub probability: Option<f64>,
    pub contracts: Option<f64>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SportsMeta {
    pub league: Option<String>,
}

/// Asset-specific attributes. Each asset class has a disjoint attribute set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalMeta {
    Equity(EquityMeta),
    Crypto(CryptoMeta),
    Prediction(PredictionMeta),
    Sports(SportsMeta),
}

impl SignalMeta {
    pub fn empty_for(asset_class: AssetClass) -> Self {
        match asset_class {
            AssetClass::Equity => Self::Equity(EquityMeta::default()),
            AssetClass::Crypto => Self::Crypto(CryptoMeta::default()),
            AssetClass::Prediction => Self::Prediction(PredictionMeta::default()),
            AssetClass::Sports => Self::Sports(SportsMeta::default()),
        }
    }
}

/// The serialized `extracted` bag: typed metadata plus free-form auxiliary keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extracted {
    pub meta: SignalMeta,
    #[serde(default)]
    pub aux: BTreeMap<String, serde_json::Value>,
}

/// A trade or bet intent extracted from one post. Identifiers are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSignal {
    pub asset_class: AssetClass,
    pub instrument: Option<String>,
    pub market_ref: Option<String>,
    pub side: Side,
    pub team: Option<String>,
    pub line_type: Option<LineType>,
    pub line: Option<f64>,
    pub odds_price: Option<f64>,
    pub size: Option<f64>,
    confidence: Option<f64>,
    pub horizon_seconds: Option<i64>,
    pub expiry_time: Option<DateTime<Utc>>,
    pub extracted: Extracted,
}

impl ParsedSignal {
    pub fn new(asset_class: AssetClass, side: Side) -> Self {
        debug_assert!(
            side.is_valid_for(asset_class),
            "side {} is not valid for {asset_class}",
            side.as_str()
        );
        Self {
            asset_class,
            instrument: None,
            market_ref: None,
            side,
            team: None,
            line_type: None,
            line: None,
            odds_price: None,
            size: None,
            confidence: None,
            horizon_seconds: None,
            expiry_time: None,
            extracted: Extracted {
                meta: SignalMeta::empty_for(asset_class),
                aux: BTreeMap::new(),
            },
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    /// Confidence is always stored clamped to [0, 1]; NaN is dropped.
    pub fn set_confidence(&mut self, confidence: Option<f64>) {
        self.confidence = confidence
            .filter(|c| !c.is_nan())
            .map(|c| c.clamp(0.0, 1.0));
    }

    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.set_confidence(confidence);
        self
    }

    pub fn with_meta(mut self, meta: SignalMeta) -> Self {
        self.extracted.meta = meta;
        self
    }

    pub fn with_aux(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.extracted.aux.insert(key.to_string(), value.into());
        self
    }
}

/// A recorded social post. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub platform: String,
    pub platform_post_id: String,
    pub account_id: i64,
    pub posted_at: DateTime<Utc>,
    pub text: String,
    pub url: Option<String>,
}

/// A stored signal joined with the post fields the outcome calculator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub id: i64,
    pub account_id: i64,
    pub posted_at: DateTime<Utc>,
    pub signal: ParsedSignal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub instrument: String,
    pub ts: DateTime<Utc>,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionQuote {
    pub market_ref: String,
    pub ts: DateTime<Utc>,
    pub yes_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketOutcome {
    Yes,
    No,
}

impl FromStr for MarketOutcome {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "YES" => Ok(Self::Yes),
            "NO" => Ok(Self::No),
            _ => Err(InputError::InvalidValue {
                field: "outcome",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResolution {
    pub market_ref: String,
    pub outcome: MarketOutcome,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SportsEvent {
    pub event_id: String,
    pub team1: String,
    pub team2: String,
    pub score1: Option<i64>,
    pub score2: Option<i64>,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SportsLine {
    pub event_id: String,
    pub line_type: LineType,
    pub line: Option<f64>,
    pub is_closing: bool,
}

/// All read-only market reference tables for one computation run.
#[derive(Debug, Clone, Default)]
pub struct MarketReference {
    pub prices: Vec<PriceBar>,
    pub quotes: Vec<PredictionQuote>,
    pub resolutions: Vec<PredictionResolution>,
    pub events: Vec<SportsEvent>,
    pub lines: Vec<SportsLine>,
}

/// Window an outcome was evaluated over: a fixed horizon, or event settlement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EvaluationWindow {
    Horizon(String),
    Event,
}

impl EvaluationWindow {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Horizon(label) => label,
            Self::Event => "event",
        }
    }
}

impl From<&str> for EvaluationWindow {
    fn from(s: &str) -> Self {
        if s == "event" {
            Self::Event
        } else {
            Self::Horizon(s.to_string())
        }
    }
}

/// One realized result for a signal. Keyed by `(signal_id, evaluation_window)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub signal_id: i64,
    pub evaluation_window: EvaluationWindow,
    pub settled_at: DateTime<Utc>,
    pub realized_return: Option<f64>,
    pub benchmark_return: Option<f64>,
    pub excess_return: Option<f64>,
    pub brier: Option<f64>,
    pub pnl_per_contract: Option<f64>,
    pub clv_points: Option<f64>,
    pub won: Option<bool>,
    pub notes: Option<String>,
}

impl Outcome {
    pub fn new(
        signal_id: i64,
        evaluation_window: EvaluationWindow,
        settled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            signal_id,
            evaluation_window,
            settled_at,
            realized_return: None,
            benchmark_return: None,
            excess_return: None,
            brier: None,
            pnl_per_contract: None,
            clv_points: None,
            won: None,
            notes: None,
        }
    }
}

/// Per-account ranking row. Keyed by `(account_id, window_days)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub account_id: i64,
    pub window_days: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub n_signals: u32,
    pub win_rate: Option<f64>,
    pub mean_excess_return: Option<f64>,
    pub sharpe_like: Option<f64>,
    pub mean_brier: Option<f64>,
    pub mean_clv_points: Option<f64>,
    pub mean_pred_pnl: Option<f64>,
    pub alpha_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_vocabulary_per_asset_class() {
        assert!(Side::Long.is_valid_for(AssetClass::Crypto));
        assert!(!Side::Yes.is_valid_for(AssetClass::Equity));
        assert!(Side::No.is_valid_for(AssetClass::Prediction));
        assert!(Side::Underdog.is_valid_for(AssetClass::Sports));
        assert!(!Side::Short.is_valid_for(AssetClass::Sports));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let s = ParsedSignal::new(AssetClass::Equity, Side::Long).with_confidence(Some(1.5));
        assert_eq!(s.confidence(), Some(1.0));
        let s = ParsedSignal::new(AssetClass::Equity, Side::Long).with_confidence(Some(-0.2));
        assert_eq!(s.confidence(), Some(0.0));
        let s = ParsedSignal::new(AssetClass::Equity, Side::Long).with_confidence(Some(f64::NAN));
        assert_eq!(s.confidence(), None);
    }

    #[test]
    fn test_line_type_accepts_ml_alias() {
        assert_eq!("ml".parse::<LineType>().unwrap(), LineType::Moneyline);
        assert_eq!("Spread".parse::<LineType>().unwrap(), LineType::Spread);
        assert!("parlay".parse::<LineType>().is_err());
    }

    #[test]
    fn test_extracted_serializes_with_kind_tag() {
        let s = ParsedSignal::new(AssetClass::Sports, Side::Over)
            .with_meta(SignalMeta::Sports(SportsMeta {
                league: Some("NBA".to_string()),
            }))
            .with_aux("raw_text", "Lakers o220.5");
        let json = serde_json::to_value(&s.extracted).unwrap();
        assert_eq!(json["meta"]["kind"], "sports");
        assert_eq!(json["meta"]["league"], "NBA");
        assert_eq!(json["aux"]["raw_text"], "Lakers o220.5");

        let back: Extracted = serde_json::from_value(json).unwrap();
        assert_eq!(back, s.extracted);
    }

    #[test]
    fn test_evaluation_window_labels() {
        assert_eq!(EvaluationWindow::from("7d").as_str(), "7d");
        assert_eq!(EvaluationWindow::from("event"), EvaluationWindow::Event);
    }
}
