use crate::config::Config;

/// Stage order and short names (Posts, Signals, Outcomes, Ranked) match the
/// `stats` command output and the table each stage writes.
pub const STAGE_NAMES: [&str; 4] = ["Posts", "Signals", "Outcomes", "Ranked"];

/// One-line description of each pipeline stage with the config values that drive it.
pub fn funnel_stage_infos(cfg: &Config) -> [String; 4] {
    let posts = "Recorded posts; parse runs once per post (posts.parsed_at IS NULL).".to_string();

    let signals = format!(
        "Equity, crypto, prediction and sports parsers on every post; extra_crypto_symbols={} extra_team_leagues={}.",
        cfg.parsers.extra_crypto_symbols.len(),
        cfg.parsers.extra_teams.len()
    );

    let overrides = cfg.outcomes.benchmark_overrides.len();
    let outcomes = format!(
        "Nearest-price joins: horizons=[{}] equity_benchmark={} crypto_benchmark={} benchmark_overrides={}; prediction and sports settle per event.",
        cfg.outcomes.horizons.join(","),
        cfg.outcomes.equity_benchmark.as_deref().unwrap_or("none"),
        cfg.outcomes.crypto_benchmark.as_deref().unwrap_or("none"),
        overrides,
    );

    let windows = cfg
        .leaderboard
        .windows_days
        .iter()
        .map(std::string::ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let ranked = format!(
        "Alpha score = mean of six population z-scores; windows_days=[{windows}]; table replaced per run."
    );

    [posts, signals, outcomes, ranked]
}
