use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{required, required_text, InputError};
use crate::types::{
    AssetClass, EvaluationWindow, Extracted, LeaderboardRow, LineType, MarketOutcome,
    MarketReference, Outcome, ParsedSignal, Post, PredictionQuote, PredictionResolution,
    PriceBar, Side, SignalMeta, SignalRecord, SportsEvent, SportsLine,
};

pub struct Database {
    pub conn: Connection,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).with_context(|| format!("opening database {path}"))?;
        // Another process (dashboard, exporter) may hold the write lock briefly.
        conn.busy_timeout(std::time::Duration::from_secs(30))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    pub fn run_migrations(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        migrate_posts_category(&self.conn).map_err(anyhow::Error::from)?;
        Ok(())
    }

    /// Run `function` and record its latency and failures under `op`.
    pub fn timed<R>(&self, op: &'static str, function: impl FnOnce(&Self) -> Result<R>) -> Result<R> {
        let start = std::time::Instant::now();
        let res = function(self);
        let ms = start.elapsed().as_secs_f64() * 1000.0;

        let status = if res.is_ok() { "ok" } else { "err" };
        metrics::histogram!("tracker_db_query_latency_ms", "op" => op, "status" => status)
            .record(ms);
        if res.is_err() {
            metrics::counter!("tracker_db_query_errors_total", "op" => op).increment(1);
        }
        res
    }

    pub fn upsert_account(&self, platform: &str, handle: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO accounts (platform, handle, display_name) VALUES (?1, ?2, ?2)",
            params![platform, handle],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM accounts WHERE platform = ?1 AND handle = ?2",
            params![platform, handle],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn insert_post(
        &self,
        platform: &str,
        platform_post_id: &str,
        account_id: i64,
        posted_at: DateTime<Utc>,
        text: &str,
        url: Option<&str>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO posts (platform, platform_post_id, account_id, posted_at, text, url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                platform,
                platform_post_id,
                account_id,
                posted_at.timestamp(),
                text,
                url
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Posts that have not been through the parsers yet, oldest first.
    pub fn load_unparsed_posts(&self) -> Result<Vec<Post>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, platform, platform_post_id, account_id, posted_at, text, url
             FROM posts WHERE parsed_at IS NULL ORDER BY posted_at ASC, id ASC",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, Option<String>>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut posts = Vec::with_capacity(raw.len());
        for (id, platform, platform_post_id, account_id, posted_at, text, url) in raw {
            let posted_at = required(posted_at, "posts", "posted_at", id)?;
            posts.push(Post {
                id,
                platform: required_text(platform, "posts", "platform", id)?,
                platform_post_id: platform_post_id.unwrap_or_else(|| id.to_string()),
                account_id: required(account_id, "posts", "account_id", id)?,
                posted_at: epoch_to_utc("posts", id, posted_at)?,
                text: required(text, "posts", "text", id)?,
                url,
            });
        }
        Ok(posts)
    }

    /// Store the signals parsed from `post` and mark the post parsed, atomically.
    /// Returns the assigned signal ids in input order.
    pub fn insert_signals(
        &self,
        post: &Post,
        category: Option<&str>,
        signals: &[ParsedSignal],
    ) -> Result<Vec<i64>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut ids = Vec::with_capacity(signals.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO signals (post_id, account_id, asset_class, instrument, market_ref, side,
                    team, line_type, line, odds_price, size, confidence, horizon_seconds,
                    expiry_time, extracted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;
            for s in signals {
                // Sports posts rarely carry an event id; the instrument doubles as one.
                let market_ref = match (&s.market_ref, s.asset_class) {
                    (None, AssetClass::Sports) => s.instrument.clone(),
                    (m, _) => m.clone(),
                };
                let extracted = serde_json::to_string(&s.extracted)?;
                stmt.execute(params![
                    post.id,
                    post.account_id,
                    s.asset_class.as_str(),
                    s.instrument,
                    market_ref,
                    s.side.as_str(),
                    s.team,
                    s.line_type.map(|l| l.as_str()),
                    s.line,
                    s.odds_price,
                    s.size,
                    s.confidence(),
                    s.horizon_seconds,
                    s.expiry_time.map(|t| t.timestamp()),
                    extracted,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.execute(
            "UPDATE posts SET parsed_at = strftime('%s','now'), category = ?2 WHERE id = ?1",
            params![post.id, category],
        )?;
        tx.commit()?;
        Ok(ids)
    }

    pub fn load_signal_records(&self) -> Result<Vec<SignalRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.account_id, p.posted_at, s.asset_class, s.instrument, s.market_ref,
                    s.side, s.team, s.line_type, s.line, s.odds_price, s.size, s.confidence,
                    s.horizon_seconds, s.expiry_time, s.extracted
             FROM signals s JOIN posts p ON p.id = s.post_id
             ORDER BY s.id ASC",
        )?;
        let raw = stmt
            .query_map([], |row| {
                Ok(RawSignalRow {
                    id: row.get(0)?,
                    account_id: row.get(1)?,
                    posted_at: row.get(2)?,
                    asset_class: row.get(3)?,
                    instrument: row.get(4)?,
                    market_ref: row.get(5)?,
                    side: row.get(6)?,
                    team: row.get(7)?,
                    line_type: row.get(8)?,
                    line: row.get(9)?,
                    odds_price: row.get(10)?,
                    size: row.get(11)?,
                    confidence: row.get(12)?,
                    horizon_seconds: row.get(13)?,
                    expiry_time: row.get(14)?,
                    extracted: row.get(15)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(RawSignalRow::into_record)
            .collect::<std::result::Result<Vec<_>, InputError>>()
            .map_err(anyhow::Error::from)
    }

    pub fn insert_market_reference(&self, refs: &MarketReference) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for p in &refs.prices {
            tx.execute(
                "INSERT INTO price_bars (instrument, ts, price) VALUES (?1, ?2, ?3)",
                params![p.instrument, p.ts.timestamp(), p.price],
            )?;
        }
        for q in &refs.quotes {
            tx.execute(
                "INSERT INTO prediction_quotes (market_ref, ts, yes_price) VALUES (?1, ?2, ?3)",
                params![q.market_ref, q.ts.timestamp(), q.yes_price],
            )?;
        }
        for r in &refs.resolutions {
            let outcome = match r.outcome {
                MarketOutcome::Yes => "YES",
                MarketOutcome::No => "NO",
            };
            tx.execute(
                "INSERT OR REPLACE INTO prediction_resolutions (market_ref, outcome, resolved_at)
                 VALUES (?1, ?2, ?3)",
                params![r.market_ref, outcome, r.resolved_at.timestamp()],
            )?;
        }
        for e in &refs.events {
            tx.execute(
                "INSERT OR REPLACE INTO sports_events (event_id, team1, team2, score1, score2, start_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![e.event_id, e.team1, e.team2, e.score1, e.score2, e.start_time.timestamp()],
            )?;
        }
        for l in &refs.lines {
            tx.execute(
                "INSERT INTO sports_lines (event_id, line_type, line, is_closing) VALUES (?1, ?2, ?3, ?4)",
                params![l.event_id, l.line_type.as_str(), l.line, l.is_closing],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    #[allow(clippy::too_many_lines)] // five reference tables, one query each
    pub fn load_market_reference(&self) -> Result<MarketReference> {
        let mut refs = MarketReference::default();

        let mut stmt = self
            .conn
            .prepare("SELECT rowid, instrument, ts, price FROM price_bars ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (rowid, instrument, ts, price) in rows {
            refs.prices.push(PriceBar {
                instrument,
                ts: epoch_to_utc("price_bars", rowid, ts)?,
                price,
            });
        }

        let mut stmt = self
            .conn
            .prepare("SELECT rowid, market_ref, ts, yes_price FROM prediction_quotes ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, f64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (rowid, market_ref, ts, yes_price) in rows {
            refs.quotes.push(PredictionQuote {
                market_ref,
                ts: epoch_to_utc("prediction_quotes", rowid, ts)?,
                yes_price,
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT rowid, market_ref, outcome, resolved_at FROM prediction_resolutions ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (rowid, market_ref, outcome, resolved_at) in rows {
            // Voided / N/A resolutions settle nothing; treat as unresolved.
            let Ok(outcome) = outcome.parse::<MarketOutcome>() else {
                tracing::debug!(%market_ref, %outcome, "skipping non-binary resolution");
                continue;
            };
            refs.resolutions.push(PredictionResolution {
                market_ref,
                outcome,
                resolved_at: epoch_to_utc("prediction_resolutions", rowid, resolved_at)?,
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT rowid, event_id, team1, team2, score1, score2, start_time
             FROM sports_events ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (rowid, event_id, team1, team2, score1, score2, start_time) in rows {
            refs.events.push(SportsEvent {
                event_id,
                team1,
                team2,
                score1,
                score2,
                start_time: epoch_to_utc("sports_events", rowid, start_time)?,
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT event_id, line_type, line, is_closing FROM sports_lines ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (event_id, line_type, line, is_closing) in rows {
            refs.lines.push(SportsLine {
                event_id,
                line_type: line_type.parse()?,
                line,
                is_closing,
            });
        }

        Ok(refs)
    }

    /// Replace the whole outcomes table with `outcomes` in one transaction.
    pub fn replace_outcomes(&self, outcomes: &[Outcome]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM outcomes", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO outcomes (signal_id, evaluation_window, settled_at, realized_return,
                    benchmark_return, excess_return, brier, pnl_per_contract, clv_points, won, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for o in outcomes {
                stmt.execute(params![
                    o.signal_id,
                    o.evaluation_window.as_str(),
                    o.settled_at.timestamp(),
                    o.realized_return,
                    o.benchmark_return,
                    o.excess_return,
                    o.brier,
                    o.pnl_per_contract,
                    o.clv_points,
                    o.won,
                    o.notes,
                ])?;
            }
        }
        tx.commit()?;
        Ok(outcomes.len())
    }

    pub fn load_outcomes(&self) -> Result<Vec<Outcome>> {
        let mut stmt = self.conn.prepare(
            "SELECT signal_id, evaluation_window, settled_at, realized_return, benchmark_return,
                    excess_return, brier, pnl_per_contract, clv_points, won, notes
             FROM outcomes ORDER BY signal_id, evaluation_window",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    [
                        row.get::<_, Option<f64>>(3)?,
                        row.get::<_, Option<f64>>(4)?,
                        row.get::<_, Option<f64>>(5)?,
                        row.get::<_, Option<f64>>(6)?,
                        row.get::<_, Option<f64>>(7)?,
                        row.get::<_, Option<f64>>(8)?,
                    ],
                    row.get::<_, Option<bool>>(9)?,
                    row.get::<_, Option<String>>(10)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut outcomes = Vec::with_capacity(rows.len());
        for (signal_id, window, settled_at, m, won, notes) in rows {
            let [realized_return, benchmark_return, excess_return, brier, pnl_per_contract, clv_points] =
                m;
            outcomes.push(Outcome {
                signal_id,
                evaluation_window: EvaluationWindow::from(window.as_str()),
                settled_at: epoch_to_utc("outcomes", signal_id, settled_at)?,
                realized_return,
                benchmark_return,
                excess_return,
                brier,
                pnl_per_contract,
                clv_points,
                won,
                notes,
            });
        }
        Ok(outcomes)
    }

    /// Replace the whole leaderboard table; rows for every window are written together.
    pub fn replace_leaderboard(&self, rows: &[LeaderboardRow]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM leaderboard", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO leaderboard (account_id, window_days, start_date, end_date, n_signals,
                    win_rate, mean_excess_return, sharpe_like, mean_brier, mean_clv_points,
                    mean_pred_pnl, alpha_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for r in rows {
                stmt.execute(params![
                    r.account_id,
                    r.window_days,
                    r.start_date.format("%Y-%m-%d").to_string(),
                    r.end_date.format("%Y-%m-%d").to_string(),
                    r.n_signals,
                    r.win_rate,
                    r.mean_excess_return,
                    r.sharpe_like,
                    r.mean_brier,
                    r.mean_clv_points,
                    r.mean_pred_pnl,
                    r.alpha_score,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn load_leaderboard(&self, window_days: u32) -> Result<Vec<LeaderboardRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT account_id, window_days, start_date, end_date, n_signals, win_rate,
                    mean_excess_return, sharpe_like, mean_brier, mean_clv_points, mean_pred_pnl,
                    alpha_score
             FROM leaderboard WHERE window_days = ?1
             ORDER BY alpha_score DESC, account_id ASC",
        )?;
        let rows = stmt
            .query_map(params![window_days], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, u32>(4)?,
                    [
                        row.get::<_, Option<f64>>(5)?,
                        row.get::<_, Option<f64>>(6)?,
                        row.get::<_, Option<f64>>(7)?,
                        row.get::<_, Option<f64>>(8)?,
                        row.get::<_, Option<f64>>(9)?,
                        row.get::<_, Option<f64>>(10)?,
                    ],
                    row.get::<_, f64>(11)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(rows.len());
        for (account_id, window_days, start, end, n_signals, m, alpha_score) in rows {
            let [win_rate, mean_excess_return, sharpe_like, mean_brier, mean_clv_points, mean_pred_pnl] =
                m;
            out.push(LeaderboardRow {
                account_id,
                window_days,
                start_date: parse_date(&start)?,
                end_date: parse_date(&end)?,
                n_signals,
                win_rate,
                mean_excess_return,
                sharpe_like,
                mean_brier,
                mean_clv_points,
                mean_pred_pnl,
                alpha_score,
            });
        }
        Ok(out)
    }

    pub fn account_handle(&self, account_id: i64) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT handle FROM accounts WHERE id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Row counts for posts, signals, outcomes and leaderboard, in that order.
    pub fn table_counts(&self) -> Result<[i64; 4]> {
        let count = |table: &str| -> Result<i64> {
            Ok(self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
        };
        Ok([
            count("posts")?,
            count("signals")?,
            count("outcomes")?,
            count("leaderboard")?,
        ])
    }
}

struct RawSignalRow {
    id: i64,
    account_id: Option<i64>,
    posted_at: Option<i64>,
    asset_class: Option<String>,
    instrument: Option<String>,
    market_ref: Option<String>,
    side: Option<String>,
    team: Option<String>,
    line_type: Option<String>,
    line: Option<f64>,
    odds_price: Option<f64>,
    size: Option<f64>,
    confidence: Option<f64>,
    horizon_seconds: Option<i64>,
    expiry_time: Option<i64>,
    extracted: Option<String>,
}

impl RawSignalRow {
    fn into_record(self) -> std::result::Result<SignalRecord, InputError> {
        let id = self.id;
        let asset_class: AssetClass =
            required_text(self.asset_class, "signals", "asset_class", id)?.parse()?;
        let side: Side = required_text(self.side, "signals", "side", id)?.parse()?;
        if !side.is_valid_for(asset_class) {
            return Err(InputError::InvalidValue {
                field: "side",
                value: format!("{} for {asset_class}", side.as_str()),
            });
        }
        let posted_at = required(self.posted_at, "posts", "posted_at", id)?;

        let extracted = match self.extracted.as_deref() {
            Some(json) => serde_json::from_str::<Extracted>(json).map_err(|e| {
                InputError::InvalidValue {
                    field: "extracted",
                    value: e.to_string(),
                }
            })?,
            None => Extracted {
                meta: SignalMeta::empty_for(asset_class),
                aux: Default::default(),
            },
        };

        let mut signal = ParsedSignal::new(asset_class, side);
        signal.instrument = self.instrument;
        signal.market_ref = self.market_ref;
        signal.team = self.team;
        signal.line_type = self.line_type.map(|l| l.parse::<LineType>()).transpose()?;
        signal.line = self.line;
        signal.odds_price = self.odds_price;
        signal.size = self.size;
        signal.set_confidence(self.confidence);
        signal.horizon_seconds = self.horizon_seconds;
        signal.expiry_time = self
            .expiry_time
            .map(|t| epoch_to_utc("signals", id, t))
            .transpose()?;
        signal.extracted = extracted;

        Ok(SignalRecord {
            id,
            account_id: required(self.account_id, "signals", "account_id", id)?,
            posted_at: epoch_to_utc("posts", id, posted_at)?,
            signal,
        })
    }
}

fn epoch_to_utc(table: &'static str, row_id: i64, secs: i64) -> std::result::Result<DateTime<Utc>, InputError> {
    DateTime::from_timestamp(secs, 0).ok_or(InputError::InvalidTimestamp {
        table,
        row_id,
        value: secs,
    })
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date {s:?}"))
}

/// Add posts.category if missing (databases created before category tagging).
fn migrate_posts_category(conn: &Connection) -> std::result::Result<(), rusqlite::Error> {
    let has: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info('posts') WHERE name='category'",
        [],
        |row| row.get(0),
    )?;
    if has == 0 {
        conn.execute("ALTER TABLE posts ADD COLUMN category TEXT", [])?;
    }
    Ok(())
}

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    platform TEXT NOT NULL,            -- x, reddit, discord
    handle TEXT NOT NULL,
    display_name TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(platform, handle)
);

CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    platform TEXT NOT NULL,
    platform_post_id TEXT,
    account_id INTEGER NOT NULL REFERENCES accounts(id),
    posted_at INTEGER NOT NULL,        -- unix epoch
    text TEXT NOT NULL,
    url TEXT,
    category TEXT,                     -- equity, crypto, prediction, sports, general
    parsed_at INTEGER,                 -- NULL until the parsers have run
    ingested_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(platform, platform_post_id)
);

CREATE TABLE IF NOT EXISTS signals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL REFERENCES posts(id),
    account_id INTEGER NOT NULL REFERENCES accounts(id),
    asset_class TEXT NOT NULL,         -- equity, crypto, prediction, sports
    instrument TEXT,
    market_ref TEXT,
    side TEXT NOT NULL,
    team TEXT,
    line_type TEXT,                    -- spread, total, moneyline
    line REAL,
    odds_price REAL,
    size REAL,
    confidence REAL,                   -- [0, 1]
    horizon_seconds INTEGER,
    expiry_time INTEGER,
    extracted TEXT                     -- JSON {meta, aux}
);

CREATE INDEX IF NOT EXISTS idx_signals_account ON signals(account_id);

CREATE TABLE IF NOT EXISTS outcomes (
    signal_id INTEGER NOT NULL REFERENCES signals(id) ON DELETE CASCADE,
    evaluation_window TEXT NOT NULL,   -- 1d, 7d, 30d, event
    settled_at INTEGER NOT NULL,
    realized_return REAL,
    benchmark_return REAL,
    excess_return REAL,
    brier REAL,
    pnl_per_contract REAL,
    clv_points REAL,
    won INTEGER,                       -- 0, 1 or NULL
    notes TEXT,
    PRIMARY KEY (signal_id, evaluation_window)
);

CREATE TABLE IF NOT EXISTS leaderboard (
    account_id INTEGER NOT NULL,
    window_days INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    n_signals INTEGER NOT NULL,
    win_rate REAL,
    mean_excess_return REAL,
    sharpe_like REAL,
    mean_brier REAL,
    mean_clv_points REAL,
    mean_pred_pnl REAL,
    alpha_score REAL NOT NULL,
    PRIMARY KEY (account_id, window_days)
);

-- Read-only market reference tables, filled by the market-data loaders.
CREATE TABLE IF NOT EXISTS price_bars (
    instrument TEXT NOT NULL,
    ts INTEGER NOT NULL,
    price REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_price_bars_instrument_ts ON price_bars(instrument, ts);

CREATE TABLE IF NOT EXISTS prediction_quotes (
    market_ref TEXT NOT NULL,
    ts INTEGER NOT NULL,
    yes_price REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS prediction_resolutions (
    market_ref TEXT PRIMARY KEY,
    outcome TEXT NOT NULL,             -- YES, NO (anything else is ignored)
    resolved_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sports_events (
    event_id TEXT PRIMARY KEY,
    team1 TEXT NOT NULL,
    team2 TEXT NOT NULL,
    score1 INTEGER,
    score2 INTEGER,
    start_time INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sports_lines (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id TEXT NOT NULL,
    line_type TEXT NOT NULL,           -- spread, total, moneyline (ml)
    line REAL,
    is_closing INTEGER NOT NULL DEFAULT 0
);
";
