//! Batch glue between the store and the core: parse new posts, recompute
//! outcomes, rebuild the leaderboard.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use common::config::Config;
use common::db::Database;

use crate::leaderboard::build_all_windows;
use crate::outcomes::{compute_all, OutcomeSettings};
use crate::parsers::{ParserSet, ParserTables};
use crate::text::detect_post_category;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseSummary {
    pub posts: usize,
    pub signals: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub parsed: ParseSummary,
    pub outcomes: usize,
    pub leaderboard_rows: usize,
}

pub struct Pipeline {
    parsers: ParserSet,
    settings: OutcomeSettings,
    windows_days: Vec<u32>,
}

impl Pipeline {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let tables = Arc::new(ParserTables::with_extras(&cfg.parsers));
        Ok(Self {
            parsers: ParserSet::new(tables),
            settings: OutcomeSettings::from_config(&cfg.outcomes)?,
            windows_days: cfg.leaderboard.windows_days.clone(),
        })
    }

    /// Parse every post not yet seen. Each post and its signals commit together.
    pub fn run_parse(&self, db: &Database) -> Result<ParseSummary> {
        let posts = db.timed("parse.load_unparsed_posts", Database::load_unparsed_posts)?;
        let mut summary = ParseSummary::default();
        for post in &posts {
            let signals = self.parsers.parse_all(&post.text);
            let category = detect_post_category(&post.text);
            db.timed("parse.insert_signals", |db| {
                db.insert_signals(post, Some(category), &signals)
            })?;

            for s in &signals {
                metrics::counter!(
                    "tracker_signals_extracted_total",
                    "asset_class" => s.asset_class.as_str()
                )
                .increment(1);
            }
            tracing::debug!(
                post_id = post.id,
                signals = signals.len(),
                category,
                "post parsed"
            );
            summary.posts += 1;
            summary.signals += signals.len();
        }
        metrics::counter!("tracker_posts_parsed_total").increment(summary.posts as u64);
        tracing::info!(
            posts = summary.posts,
            signals = summary.signals,
            "parse complete"
        );
        Ok(summary)
    }

    /// Recompute outcomes for every stored signal and replace the table.
    pub fn run_outcomes(&self, db: &Database) -> Result<usize> {
        let records = db.timed("outcomes.load_signals", Database::load_signal_records)?;
        let refs = db.timed("outcomes.load_reference", Database::load_market_reference)?;
        let outcomes = compute_all(&records, &refs, &self.settings);
        db.timed("outcomes.replace", |db| db.replace_outcomes(&outcomes))
    }

    /// Rebuild every configured leaderboard window as of `as_of` and replace the table.
    pub fn run_leaderboard(&self, db: &Database, as_of: NaiveDate) -> Result<usize> {
        let records = db.timed("leaderboard.load_signals", Database::load_signal_records)?;
        let outcomes = db.timed("leaderboard.load_outcomes", Database::load_outcomes)?;
        let rows = build_all_windows(&records, &outcomes, &self.windows_days, as_of);
        let written = db.timed("leaderboard.replace", |db| db.replace_leaderboard(&rows))?;
        metrics::gauge!("tracker_leaderboard_rows").set(written as f64);
        tracing::info!(rows = written, %as_of, "leaderboard rebuilt");
        Ok(written)
    }

    pub fn run_all(&self, db: &Database, as_of: NaiveDate) -> Result<RunSummary> {
        let parsed = self.run_parse(db)?;
        let outcomes = self.run_outcomes(db)?;
        let leaderboard_rows = self.run_leaderboard(db, as_of)?;
        Ok(RunSummary {
            parsed,
            outcomes,
            leaderboard_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use common::error::InputError;
    use common::types::{MarketReference, PriceBar};

    const CONFIG: &str = r#"
[general]
log_level = "info"

[database]
path = ":memory:"

[outcomes]
horizons = ["1d"]
equity_benchmark = "SPY"

[leaderboard]
windows_days = [30]
"#;

    fn setup() -> (Database, Pipeline) {
        let db = Database::open(":memory:").unwrap();
        db.run_migrations().unwrap();
        let cfg = Config::from_toml_str(CONFIG).unwrap();
        (db, Pipeline::from_config(&cfg).unwrap())
    }

    fn bar(instrument: &str, day: u32, price: f64) -> PriceBar {
        PriceBar {
            instrument: instrument.to_string(),
            ts: Utc.with_ymd_and_hms(2024, 3, day, 14, 0, 0).unwrap(),
            price,
        }
    }

    #[test]
    fn test_end_to_end_run() {
        let (db, pipeline) = setup();
        let alice = db.upsert_account("x", "alice").unwrap();
        let bob = db.upsert_account("x", "bob").unwrap();
        let posted = Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap();
        db.insert_post("x", "1", alice, posted, "$AAPL calls, target $195, entry $188", None)
            .unwrap();
        db.insert_post("x", "2", bob, posted, "gm everyone", None).unwrap();
        db.insert_market_reference(&MarketReference {
            prices: vec![
                bar("AAPL", 4, 100.0),
                bar("AAPL", 5, 110.0),
                bar("SPY", 4, 200.0),
                bar("SPY", 5, 202.0),
            ],
            ..MarketReference::default()
        })
        .unwrap();

        let as_of = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let summary = pipeline.run_all(&db, as_of).unwrap();
        assert_eq!(summary.parsed.posts, 2);
        // Equity AAPL plus the AAPL-USD crypto reading, which has no prices.
        assert_eq!(summary.parsed.signals, 2);
        assert_eq!(summary.outcomes, 1);
        assert_eq!(summary.leaderboard_rows, 1);

        let rows = db.load_leaderboard(30).unwrap();
        assert_eq!(rows[0].account_id, alice);
        assert_eq!(rows[0].n_signals, 2);
        assert!((rows[0].mean_excess_return.unwrap() - 0.09).abs() < 1e-9);

        // Second run parses nothing new and rebuilds the same tables.
        let again = pipeline.run_all(&db, as_of).unwrap();
        assert_eq!(again.parsed, ParseSummary::default());
        assert_eq!(db.load_leaderboard(30).unwrap(), rows);
    }

    #[test]
    fn test_malformed_post_aborts_before_any_write() {
        let (db, pipeline) = setup();
        let id = db.upsert_account("x", "carol").unwrap();
        let posted = Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap();
        db.insert_post("x", "8", id, posted, "$NVDA long", None).unwrap();
        db.conn
            .execute(
                "INSERT INTO posts (platform, platform_post_id, account_id, posted_at, text)
                 VALUES ('x', '9', ?1, ?2, 'bad clock')",
                rusqlite::params![id, i64::MAX],
            )
            .unwrap();

        let err = pipeline.run_parse(&db).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::InvalidTimestamp { table: "posts", .. })
        ));
        assert_eq!(db.table_counts().unwrap()[1], 0);
    }

    #[test]
    fn test_side_outside_asset_class_is_input_error() {
        let (db, pipeline) = setup();
        let id = db.upsert_account("x", "dave").unwrap();
        let posted = Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap();
        let post_id = db.insert_post("x", "10", id, posted, "gm", None).unwrap();
        db.conn
            .execute(
                "INSERT INTO signals (post_id, account_id, asset_class, instrument, side)
                 VALUES (?1, ?2, 'equity', 'AAPL', 'yes')",
                rusqlite::params![post_id, id],
            )
            .unwrap();

        let err = pipeline.run_outcomes(&db).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::InvalidValue { field: "side", .. })
        ));
        assert_eq!(db.table_counts().unwrap()[2], 0);
    }
}
