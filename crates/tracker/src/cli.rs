use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use common::config::Config;
use common::db::Database;
use common::funnel::{funnel_stage_infos, STAGE_NAMES};

use crate::pipeline::Pipeline;
use crate::timeframe::humanize_duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run,
    Parse,
    Outcomes,
    Leaderboard,
    Rankings { window_days: Option<u32> },
    Account { id: i64 },
    Stats,
}

pub fn parse_args<I>(mut args: I) -> std::result::Result<Command, String>
where
    I: Iterator<Item = String>,
{
    // Drop argv[0].
    let _ = args.next();

    let Some(cmd) = args.next() else {
        return Ok(Command::Run);
    };

    match cmd.as_str() {
        "run" => Ok(Command::Run),
        "parse" => Ok(Command::Parse),
        "outcomes" => Ok(Command::Outcomes),
        "leaderboard" => Ok(Command::Leaderboard),
        "rankings" => {
            let window_days = args
                .next()
                .map(|w| {
                    w.parse::<u32>()
                        .map_err(|e| format!("window_days must be a positive integer, got {w:?}: {e}"))
                })
                .transpose()?;
            Ok(Command::Rankings { window_days })
        }
        "account" => {
            let id = args
                .next()
                .ok_or_else(|| "usage: tracker account <id>".to_string())?;
            let id = id
                .parse::<i64>()
                .map_err(|e| format!("account id must be an integer, got {id:?}: {e}"))?;
            Ok(Command::Account { id })
        }
        "stats" => Ok(Command::Stats),
        other => Err(format!("unknown command: {other}")),
    }
}

pub fn run_command(db: &Database, cfg: &Config, cmd: Command, as_of: NaiveDate) -> Result<()> {
    match cmd {
        Command::Run => {
            let summary = Pipeline::from_config(cfg)?.run_all(db, as_of)?;
            println!(
                "posts={} signals={} outcomes={} leaderboard_rows={}",
                summary.parsed.posts,
                summary.parsed.signals,
                summary.outcomes,
                summary.leaderboard_rows
            );
            Ok(())
        }
        Command::Parse => {
            let parsed = Pipeline::from_config(cfg)?.run_parse(db)?;
            println!("posts={} signals={}", parsed.posts, parsed.signals);
            Ok(())
        }
        Command::Outcomes => {
            let n = Pipeline::from_config(cfg)?.run_outcomes(db)?;
            println!("outcomes={n}");
            Ok(())
        }
        Command::Leaderboard => {
            let n = Pipeline::from_config(cfg)?.run_leaderboard(db, as_of)?;
            println!("leaderboard_rows={n}");
            Ok(())
        }
        Command::Rankings { window_days } => {
            let days = window_days
                .or_else(|| cfg.leaderboard.windows_days.first().copied())
                .unwrap_or(30);
            show_rankings(db, days)
        }
        Command::Account { id } => show_account(db, id),
        Command::Stats => show_stats(db, cfg),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingRow {
    pub handle: String,
    pub n_signals: u32,
    pub win_rate: Option<f64>,
    pub mean_excess_return: Option<f64>,
    pub alpha_score: f64,
}

pub fn query_rankings(db: &Database, window_days: u32) -> Result<Vec<RankingRow>> {
    let mut out = Vec::new();
    for row in db.load_leaderboard(window_days)?.into_iter().take(20) {
        let handle = db
            .account_handle(row.account_id)?
            .unwrap_or_else(|| format!("#{}", row.account_id));
        out.push(RankingRow {
            handle,
            n_signals: row.n_signals,
            win_rate: row.win_rate,
            mean_excess_return: row.mean_excess_return,
            alpha_score: row.alpha_score,
        });
    }
    Ok(out)
}

fn show_rankings(db: &Database, window_days: u32) -> Result<()> {
    println!("Account rankings ({window_days}d):");
    for (i, r) in query_rankings(db, window_days)?.iter().enumerate() {
        println!(
            "{rank:>3}  {alpha:>6.3}  n={n:<4} win={win}  excess={excess}  {handle}",
            rank = i + 1,
            alpha = r.alpha_score,
            n = r.n_signals,
            win = fmt_opt(r.win_rate),
            excess = fmt_opt(r.mean_excess_return),
            handle = r.handle
        );
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountSignalRow {
    pub signal_id: i64,
    pub posted_at: i64,
    pub asset_class: String,
    pub instrument: Option<String>,
    pub side: String,
    pub horizon_seconds: Option<i64>,
    pub outcomes: i64,
}

pub fn query_account_signals(db: &Database, account_id: i64) -> Result<Vec<AccountSignalRow>> {
    let mut stmt = db.conn.prepare(
        r"
        SELECT s.id, p.posted_at, s.asset_class, COALESCE(s.instrument, s.market_ref), s.side,
               s.horizon_seconds, (SELECT COUNT(*) FROM outcomes o WHERE o.signal_id = s.id)
        FROM signals s
        JOIN posts p ON p.id = s.post_id
        WHERE s.account_id = ?1
        ORDER BY p.posted_at DESC, s.id ASC
        LIMIT 50
        ",
    )?;
    let rows = stmt.query_map(rusqlite::params![account_id], |row| {
        Ok(AccountSignalRow {
            signal_id: row.get(0)?,
            posted_at: row.get(1)?,
            asset_class: row.get(2)?,
            instrument: row.get(3)?,
            side: row.get(4)?,
            horizon_seconds: row.get(5)?,
            outcomes: row.get(6)?,
        })
    })?;
    Ok(rows.filter_map(|r| r.ok()).collect())
}

fn show_account(db: &Database, account_id: i64) -> Result<()> {
    let Some(handle) = db.account_handle(account_id)? else {
        println!("Account #{account_id}: (not in accounts table)");
        return Ok(());
    };
    println!("Account #{account_id}: {handle}");

    for r in query_account_signals(db, account_id)? {
        let posted = DateTime::<Utc>::from_timestamp(r.posted_at, 0)
            .map_or_else(|| r.posted_at.to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
        let horizon = r
            .horizon_seconds
            .map_or_else(|| "-".to_string(), humanize_duration);
        println!(
            "  #{id:<6} {posted}  {class:<10} {side:<8} horizon={horizon:<9} outcomes={n}  {instrument}",
            id = r.signal_id,
            class = r.asset_class,
            side = r.side,
            n = r.outcomes,
            instrument = r.instrument.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn show_stats(db: &Database, cfg: &Config) -> Result<()> {
    let counts = db.timed("stats.table_counts", Database::table_counts)?;
    let infos = funnel_stage_infos(cfg);
    println!("Pipeline funnel:");
    for ((name, count), info) in STAGE_NAMES.iter().zip(counts).zip(infos) {
        println!("  {name:<9} {count:>8}  {info}");
    }
    Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::types::{AssetClass, ParsedSignal, Side};

    fn db() -> Database {
        let db = Database::open(":memory:").unwrap();
        db.run_migrations().unwrap();
        db
    }

    fn args(list: &[&str]) -> std::vec::IntoIter<String> {
        list.iter()
            .map(|s| (*s).to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_parse_args_defaults_to_run() {
        let cmd = parse_args(vec!["tracker".to_string()].into_iter()).unwrap();
        assert_eq!(cmd, Command::Run);
    }

    #[test]
    fn test_parse_rankings_and_account() {
        assert_eq!(
            parse_args(args(&["tracker", "rankings"])).unwrap(),
            Command::Rankings { window_days: None }
        );
        assert_eq!(
            parse_args(args(&["tracker", "rankings", "90"])).unwrap(),
            Command::Rankings {
                window_days: Some(90)
            }
        );
        assert_eq!(
            parse_args(args(&["tracker", "account", "7"])).unwrap(),
            Command::Account { id: 7 }
        );
        assert!(parse_args(args(&["tracker", "account"])).is_err());
        assert!(parse_args(args(&["tracker", "account", "seven"])).is_err());
        assert!(parse_args(args(&["tracker", "rankings", "-1"])).is_err());
        assert!(parse_args(args(&["tracker", "dance"])).is_err());
    }

    #[test]
    fn test_query_rankings_resolves_handles_in_alpha_order() {
        let db = db();
        let a = db.upsert_account("x", "alpha").unwrap();
        let b = db.upsert_account("x", "beta").unwrap();
        for (account, alpha) in [(a, -0.2), (b, 0.4)] {
            db.conn
                .execute(
                    "INSERT INTO leaderboard (account_id, window_days, start_date, end_date, n_signals, alpha_score)
                     VALUES (?1, 30, '2024-03-01', '2024-03-31', 3, ?2)",
                    rusqlite::params![account, alpha],
                )
                .unwrap();
        }

        let rows = query_rankings(&db, 30).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].handle, "beta");
        assert_eq!(rows[1].handle, "alpha");
        assert!(query_rankings(&db, 90).unwrap().is_empty());
    }

    #[test]
    fn test_query_account_signals_counts_outcomes() {
        let db = db();
        let account = db.upsert_account("x", "gamma").unwrap();
        let posted = Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, 0).unwrap();
        let post_id = db
            .insert_post("x", "1", account, posted, "$TSLA long", None)
            .unwrap();
        let post = db
            .load_unparsed_posts()
            .unwrap()
            .into_iter()
            .find(|p| p.id == post_id)
            .unwrap();
        let mut signal = ParsedSignal::new(AssetClass::Equity, Side::Long);
        signal.instrument = Some("TSLA".to_string());
        signal.horizon_seconds = Some(86_400);
        db.insert_signals(&post, Some("equity"), &[signal]).unwrap();

        let rows = query_account_signals(&db, account).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].asset_class, "equity");
        assert_eq!(rows[0].instrument.as_deref(), Some("TSLA"));
        assert_eq!(rows[0].outcomes, 0);
        assert_eq!(rows[0].posted_at, posted.timestamp());
    }
}
