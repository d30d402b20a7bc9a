// tests/metrics_pipeline.rs
#![cfg(feature = "strict-metrics")]
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use crypto_sentiment::config::PipelineConfig;
use crypto_sentiment::feed::{capture, StoreFeed};
use crypto_sentiment::store::MemoryStore;
use crypto_sentiment::{DailyRun, RawItem};
use metrics_exporter_prometheus::PrometheusBuilder;

#[tokio::test]
async fn metrics_exposed_after_daily_run() {
    // Install a local recorder for the test
    let handle = PrometheusBuilder::new().install_recorder().expect("recorder");

    let store = Arc::new(MemoryStore::new());
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    capture(
        store.as_ref(),
        &[
            RawItem::tweet("1", at, "btc rally looks strong today"),
            RawItem::tweet("2", at, "RT btc rally looks strong today"),
            RawItem::article("a1", at, "bitcoin crash fears grow among traders"),
        ],
    )
    .await
    .unwrap();

    let run = DailyRun::from_config(
        &PipelineConfig::default(),
        store.clone(),
        Arc::new(StoreFeed::new(store.clone())),
    )
    .unwrap();
    run.run(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        .await
        .unwrap();

    // Scrape metrics text and check series presence by substring
    let out = handle.render();
    for needle in [
        "pipeline_items_fetched_total",
        "pipeline_items_kept_total",
        "pipeline_items_rejected_total",
        "pipeline_classified_total",
        "pipeline_classify_ms",
        "pipeline_last_score",
    ] {
        assert!(out.contains(needle), "missing series {needle}");
    }
}
