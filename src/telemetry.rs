// src/telemetry.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// One-time metrics registration (so series show up in the exposition).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "pipeline_items_fetched_total",
            "Raw items fetched from the feed, by kind."
        );
        describe_counter!(
            "pipeline_items_kept_total",
            "Items that passed normalization + validation, by kind."
        );
        describe_counter!(
            "pipeline_items_rejected_total",
            "Items dropped by the validator, by reason."
        );
        describe_counter!(
            "pipeline_classified_total",
            "Items labelled by a classification service."
        );
        describe_counter!(
            "pipeline_worker_failures_total",
            "Classification worker calls that failed or timed out."
        );
        describe_histogram!(
            "pipeline_classify_ms",
            "Wall time of one parallel classification call in milliseconds."
        );
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the daily run last completed."
        );
        describe_gauge!("pipeline_last_score", "Sentiment score of the last run.");
    });
}

/// Install the global tracing subscriber.
/// Filter comes from `RUST_LOG` (default `crypto_sentiment=info,warn`);
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crypto_sentiment=info,daily_sentiment=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

/// Install the Prometheus recorder; the handle renders the exposition text.
pub fn install_prometheus() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("prometheus: install recorder")?;
    ensure_metrics_described();
    Ok(handle)
}
