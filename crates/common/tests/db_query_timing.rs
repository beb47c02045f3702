use metrics_exporter_prometheus::PrometheusBuilder;

#[test]
fn timed_records_latency_and_errors() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    metrics::with_local_recorder(&recorder, || {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let db = common::db::Database::open(tmp.path().to_str().unwrap()).unwrap();
        db.run_migrations().unwrap();

        let counts = db.timed("stats.counts", common::db::Database::table_counts).unwrap();
        assert_eq!(counts, [0, 0, 0, 0]);

        let err: anyhow::Result<usize> = db.timed("missing.table", |db| {
            Ok(db.conn.execute("DELETE FROM definitely_missing_table", [])?)
        });
        assert!(err.is_err());
    });

    let rendered = handle.render();
    assert!(
        rendered.contains("tracker_db_query_latency_ms"),
        "expected tracker_db_query_latency_ms in rendered metrics, got:\n{rendered}"
    );
    assert!(
        rendered.contains("tracker_db_query_errors_total"),
        "expected tracker_db_query_errors_total in rendered metrics, got:\n{rendered}"
    );
    assert!(rendered.contains("missing.table"));
}

#[test]
fn file_backed_database_persists_between_opens() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let path = tmp.path().to_str().unwrap().to_string();

    {
        let db = common::db::Database::open(&path).unwrap();
        db.run_migrations().unwrap();
        db.upsert_account("reddit", "wsb_guy").unwrap();
    }

    let db = common::db::Database::open(&path).unwrap();
    db.run_migrations().unwrap();
    let id = db.upsert_account("reddit", "wsb_guy").unwrap();
    assert_eq!(db.account_handle(id).unwrap().as_deref(), Some("wsb_guy"));
}
