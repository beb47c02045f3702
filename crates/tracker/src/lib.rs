pub mod cli;
pub mod leaderboard;
pub mod metrics;
pub mod outcomes;
pub mod parsers;
pub mod pipeline;
pub mod text;
pub mod timeframe;
