use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub general: General,
    pub database: Database,
    pub outcomes: Outcomes,
    pub leaderboard: Leaderboard,
    #[serde(default)]
    pub parsers: Parsers,
    #[serde(default)]
    pub observability: Observability,
}

#[derive(Debug, Deserialize)]
pub struct General {
    pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct Outcomes {
    /// Timeframe labels such as "1d", "7d", "30d".
    pub horizons: Vec<String>,
    pub equity_benchmark: Option<String>,
    pub crypto_benchmark: Option<String>,
    #[serde(default)]
    pub benchmark_overrides: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct Leaderboard {
    pub windows_days: Vec<u32>,
}

/// Additions to the built-in lookup tables. Appended after the built-ins, so
/// built-in entries keep priority.
#[derive(Debug, Default, Deserialize)]
pub struct Parsers {
    #[serde(default)]
    pub extra_crypto_symbols: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub extra_teams: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Observability {
    pub prometheus_port: Option<u16>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = std::env::var("TRACKER_CONFIG").unwrap_or_else(|_| "config/default.toml".into());
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("reading config {path}"))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        if cfg.outcomes.horizons.is_empty() {
            anyhow::bail!("outcomes.horizons must list at least one horizon");
        }
        if cfg.leaderboard.windows_days.iter().any(|d| *d == 0) {
            anyhow::bail!("leaderboard.windows_days entries must be positive");
        }
        Ok(cfg)
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_toml_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_default_config() {
        let config = Config::from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.outcomes.horizons, vec!["1d", "7d", "30d"]);
        assert_eq!(config.outcomes.equity_benchmark.as_deref(), Some("SPY"));
        assert_eq!(config.outcomes.crypto_benchmark.as_deref(), Some("BTC-USD"));
        assert!(config.leaderboard.windows_days.contains(&90));
    }

    #[test]
    fn test_optional_sections_default() {
        let toml = r#"
[general]
log_level = "debug"

[database]
path = ":memory:"

[outcomes]
horizons = ["1d"]

[leaderboard]
windows_days = [30]
"#;
        let config = Config::from_toml_str(toml).unwrap();
        assert!(config.observability.prometheus_port.is_none());
        assert!(config.parsers.extra_crypto_symbols.is_empty());
        assert!(config.outcomes.equity_benchmark.is_none());
        assert!(config.outcomes.benchmark_overrides.is_empty());
    }

    #[test]
    fn test_parser_extras_and_overrides() {
        let toml = r#"
[general]
log_level = "info"

[database]
path = "data/tracker.db"

[outcomes]
horizons = ["1d", "7d"]
equity_benchmark = "SPY"

[outcomes.benchmark_overrides]
TSM = "SOXX"

[leaderboard]
windows_days = [30, 90]

[parsers.extra_crypto_symbols]
JUP = ["jupiter", "jup"]

[parsers.extra_teams]
NFL = ["packers"]
"#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(
            config.outcomes.benchmark_overrides.get("TSM").map(String::as_str),
            Some("SOXX")
        );
        assert_eq!(config.parsers.extra_crypto_symbols["JUP"], vec!["jupiter", "jup"]);
        assert_eq!(config.parsers.extra_teams["NFL"], vec!["packers"]);
    }

    #[test]
    fn test_rejects_empty_horizons_and_zero_window() {
        let base = |horizons: &str, windows: &str| {
            format!(
                "[general]\nlog_level = \"info\"\n[database]\npath = \":memory:\"\n\
                 [outcomes]\nhorizons = {horizons}\n[leaderboard]\nwindows_days = {windows}\n"
            )
        };
        assert!(Config::from_toml_str(&base("[]", "[30]")).is_err());
        assert!(Config::from_toml_str(&base("[\"1d\"]", "[0]")).is_err());
        assert!(Config::from_toml_str(&base("[\"1d\"]", "[30]")).is_ok());
    }
}
