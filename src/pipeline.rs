//! # Daily Run
//! One run per calendar day:
//! fetch -> normalize+validate -> classify (parallel) -> persist items ->
//! aggregate -> persist daily summary.
//!
//! Both kinds are classified before anything is written, so a failed
//! classification leaves the store exactly as it was. Every write is an
//! upsert keyed by item id or by day, which makes reruns overwrite.

use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use metrics::{counter, gauge};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::aggregate::aggregate;
use crate::classify::build_classifier;
use crate::config::PipelineConfig;
use crate::daywindow::DayWindow;
use crate::dispatch::Dispatcher;
use crate::error::{PipelineError, Result};
use crate::feed::FeedSource;
use crate::model::{Classification, DailySentiment, ItemKind, RawItem, StoredItem, ValidatedItem};
use crate::store::{to_document, DocumentStore, Query, UpsertOutcome};
use crate::telemetry::ensure_metrics_described;
use crate::validate::Validator;

pub const DAILY_COLLECTION: &str = "daily_sentiment";

/// Per-kind counters of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindReport {
    pub fetched: usize,
    pub kept: usize,
    pub rejected: usize,
    pub classified: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub day: NaiveDate,
    pub tweets: KindReport,
    pub articles: KindReport,
    pub summary: DailySentiment,
    /// `false` when the day's summary already existed and was overwritten.
    pub summary_created: bool,
}

impl RunReport {
    /// Nothing leaned bullish or bearish today. Still a persisted result.
    pub fn is_no_signal(&self) -> bool {
        !self.summary.has_signal()
    }
}

pub struct DailyRun {
    store: Arc<dyn DocumentStore>,
    feed: Arc<dyn FeedSource>,
    tweets: Dispatcher,
    articles: Dispatcher,
    validator: Validator,
    offset: FixedOffset,
}

impl DailyRun {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        feed: Arc<dyn FeedSource>,
        tweets: Dispatcher,
        articles: Dispatcher,
        validator: Validator,
        offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            feed,
            tweets,
            articles,
            validator,
            offset,
        }
    }

    /// Build classifiers and dispatchers from configuration. A worker count
    /// below 1 is rejected here, before any work starts.
    pub fn from_config(
        cfg: &PipelineConfig,
        store: Arc<dyn DocumentStore>,
        feed: Arc<dyn FeedSource>,
    ) -> anyhow::Result<Self> {
        let timeout = cfg.worker_timeout();
        let tweets = Dispatcher::new(build_classifier(&cfg.tweets, timeout)?, cfg.workers, timeout)?
            .prefer_prepared(cfg.tweets.prepared_inputs);
        let articles = Dispatcher::new(build_classifier(&cfg.articles, timeout)?, cfg.workers, timeout)?
            .prefer_prepared(cfg.articles.prepared_inputs);
        info!(
            tweets = tweets.profile(),
            articles = articles.profile(),
            workers = cfg.workers,
            offset = %cfg.utc_offset,
            "daily run configured"
        );
        Ok(Self::new(store, feed, tweets, articles, cfg.validator(), cfg.offset()?))
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Run for the current date in the configured offset.
    pub async fn run_today(&self) -> Result<RunReport> {
        self.run(DayWindow::today(self.offset).day).await
    }

    #[tracing::instrument(name = "daily_run", skip_all, fields(day = %day))]
    pub async fn run(&self, day: NaiveDate) -> Result<RunReport> {
        ensure_metrics_described();
        let window = DayWindow::for_day(day, self.offset);

        // (1) Fetch
        let batch = self.feed.fetch(&window).await.map_err(|e| {
            error!(feed = self.feed.name(), error = %format!("{e:#}"), "feed unreachable, aborting run");
            PipelineError::FeedUnavailable(format!("{}: {e:#}", self.feed.name()))
        })?;
        info!(tweets = batch.tweets.len(), articles = batch.articles.len(), "fetched");

        // (2) Normalize + validate
        let (tweets, mut tweet_report) = self.admit(ItemKind::Tweet, batch.tweets);
        let (articles, mut article_report) = self.admit(ItemKind::Article, batch.articles);

        // (3) Classify every kind before writing anything
        let tweet_cls = self.classify_kind(ItemKind::Tweet, &self.tweets, &tweets).await?;
        let article_cls = self.classify_kind(ItemKind::Article, &self.articles, &articles).await?;
        tweet_report.classified = tweet_cls.len();
        article_report.classified = article_cls.len();

        // (4) Persist classified items
        self.persist_items(ItemKind::Tweet, &tweets, &tweet_cls).await?;
        self.persist_items(ItemKind::Article, &articles, &article_cls).await?;

        // (5) Aggregate
        let summary = aggregate(tweet_cls.iter().chain(article_cls.iter())).into_daily(day);
        if !summary.has_signal() {
            info!(neutral = summary.neutral_count, "no polar labels today, recording zero-signal summary");
        }

        // (6) Persist the daily summary
        let outcome = self
            .store
            .upsert(
                DAILY_COLLECTION,
                &Query::new().eq("day", day.to_string()),
                to_document(&summary).map_err(PipelineError::store)?,
            )
            .await
            .map_err(PipelineError::store)?;

        gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        gauge!("pipeline_last_score").set(summary.sentiment_score);
        info!(
            score = summary.sentiment_score,
            positive = summary.positive_count,
            neutral = summary.neutral_count,
            negative = summary.negative_count,
            created = outcome == UpsertOutcome::Inserted,
            "daily sentiment stored"
        );

        Ok(RunReport {
            day,
            tweets: tweet_report,
            articles: article_report,
            summary,
            summary_created: outcome == UpsertOutcome::Inserted,
        })
    }

    fn admit(&self, kind: ItemKind, raw: Vec<RawItem>) -> (Vec<ValidatedItem>, KindReport) {
        let fetched = raw.len();
        let (kept, rejected) = self.validator.validate_batch(raw);
        counter!("pipeline_items_fetched_total", "kind" => kind.as_str()).increment(fetched as u64);
        counter!("pipeline_items_kept_total", "kind" => kind.as_str()).increment(kept.len() as u64);
        info!(kind = %kind, fetched, kept = kept.len(), rejected, "validated");
        let report = KindReport {
            fetched,
            kept: kept.len(),
            rejected,
            classified: 0,
        };
        (kept, report)
    }

    async fn classify_kind(
        &self,
        kind: ItemKind,
        dispatcher: &Dispatcher,
        items: &[ValidatedItem],
    ) -> Result<Vec<Classification>> {
        if items.is_empty() {
            info!(kind = %kind, "no eligible items, skipping classification");
            return Ok(Vec::new());
        }
        dispatcher.classify_items(items).await.inspect_err(|e| {
            warn!(kind = %kind, error = %e, "classification failed, nothing will be persisted");
        })
    }

    async fn persist_items(
        &self,
        kind: ItemKind,
        items: &[ValidatedItem],
        classifications: &[Classification],
    ) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let mut ops = Vec::with_capacity(items.len());
        for (item, cls) in items.iter().zip(classifications) {
            debug_assert_eq!(item.id(), cls.item_id);
            let doc = to_document(&StoredItem::new(item, cls)).map_err(PipelineError::store)?;
            ops.push((Query::new().eq("id", item.id()), doc));
        }
        let outcomes = self
            .store
            .upsert_many(kind.collection(), ops)
            .await
            .map_err(PipelineError::store)?;
        let inserted = outcomes
            .iter()
            .filter(|o| **o == UpsertOutcome::Inserted)
            .count();
        info!(
            kind = %kind,
            written = items.len(),
            inserted,
            collection = kind.collection(),
            "classified items stored"
        );
        Ok(())
    }
}

/// Read back the stored summary for `day`, if a run has completed for it.
pub async fn daily_summary(store: &dyn DocumentStore, day: NaiveDate) -> anyhow::Result<Option<DailySentiment>> {
    let found = store
        .find_one(DAILY_COLLECTION, &Query::new().eq("day", day.to_string()))
        .await?;
    match found {
        Some(mut doc) => {
            doc.remove(crate::store::ID_FIELD);
            Ok(Some(serde_json::from_value(serde_json::Value::Object(doc))?))
        }
        None => Ok(None),
    }
}
