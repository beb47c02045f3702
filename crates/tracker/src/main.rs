use anyhow::Result;
use tracker::{cli, metrics};

#[tokio::main]
async fn main() -> Result<()> {
    let config = common::config::Config::load()?;

    let (dispatch, _otel_guard) =
        common::observability::build_dispatch("tracker", &config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;

    tracing::info!("alpha tracker starting");

    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    let cmd = cli::parse_args(std::env::args()).map_err(anyhow::Error::msg)?;
    if let Some(port) = config.observability.prometheus_port {
        metrics::install_prometheus(port)?;
        metrics::describe();
    }

    let db = common::db::Database::open(&config.database.path)?;
    db.run_migrations()?;

    let as_of = chrono::Utc::now().date_naive();
    let span = tracing::info_span!("command", cmd = ?cmd, %as_of);
    let _g = span.enter();
    cli::run_command(&db, &config, cmd, as_of)?;

    tracing::info!("alpha tracker done");
    Ok(())
}
