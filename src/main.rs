//! Daily sentiment job: binary entrypoint.
//! Runs the pipeline once for today (configured offset) or for the
//! `YYYY-MM-DD` given as the first argument.

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use crypto_sentiment::config::PipelineConfig;
use crypto_sentiment::daywindow::DayWindow;
use crypto_sentiment::feed::StoreFeed;
use crypto_sentiment::store::{DocumentStore, JsonFileStore};
use crypto_sentiment::{telemetry, DailyRun};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();
    let prometheus = telemetry::install_prometheus()?;

    let cfg = PipelineConfig::load_default()?;
    let offset = cfg.offset()?;
    let day = match std::env::args().nth(1) {
        Some(arg) => NaiveDate::parse_from_str(&arg, "%Y-%m-%d")
            .with_context(|| format!("expected a YYYY-MM-DD day, got {arg:?}"))?,
        None => DayWindow::today(offset).day,
    };

    let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::open(&cfg.store_dir)?);
    let feed = Arc::new(StoreFeed::new(store.clone()));
    let run = DailyRun::from_config(&cfg, store, feed)?;

    info!(%day, store = %cfg.store_dir.display(), "starting daily sentiment run");
    let result = run.run(day).await;
    debug!(metrics = %prometheus.render(), "run metrics");

    match result {
        Ok(report) => {
            info!(
                %day,
                score = report.summary.sentiment_score,
                no_signal = report.is_no_signal(),
                tweets_kept = report.tweets.kept,
                articles_kept = report.articles.kept,
                "daily sentiment run finished"
            );
            Ok(())
        }
        Err(e) => {
            // A failed run never writes a daily summary; the previous one stays.
            error!(%day, error = %e, "daily sentiment run failed");
            Err(e.into())
        }
    }
}
