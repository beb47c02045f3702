use anyhow::Result;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

pub fn describe() {
    describe_counter!(
        "tracker_posts_parsed_total",
        "Number of posts run through the parsers."
    );
    describe_counter!(
        "tracker_signals_extracted_total",
        "Number of signals extracted, by asset class."
    );
    describe_counter!(
        "tracker_outcomes_computed_total",
        "Number of outcome rows computed, by branch."
    );
    describe_counter!(
        "tracker_signals_excluded_total",
        "Signals or horizons skipped for missing reference data."
    );
    describe_gauge!(
        "tracker_leaderboard_rows",
        "Leaderboard rows written by the last run."
    );
    describe_histogram!(
        "tracker_db_query_latency_ms",
        "Database operation latency in milliseconds."
    );
    describe_counter!(
        "tracker_db_query_errors_total",
        "Number of failed database operations."
    );
}

/// Install the global recorder and serve it on `port`. The exporter task is
/// spawned on the current tokio runtime.
pub fn install_prometheus(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_handle_renders_metric_names() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe();
            metrics::counter!("tracker_signals_extracted_total", "asset_class" => "crypto")
                .increment(2);
            metrics::gauge!("tracker_leaderboard_rows").set(4.0);
        });

        let rendered = handle.render();
        assert!(rendered.contains("tracker_signals_extracted_total{asset_class=\"crypto\"} 2"));
        assert!(rendered.contains("tracker_leaderboard_rows 4"));
    }
}
