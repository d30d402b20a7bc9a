// src/feed.rs
//! Feed source: where captured posts and articles come from.
//!
//! Scrapers persist what they capture into the `scraped_data` collection
//! (`type`, `id`, `created`, `content`, ...). `StoreFeed` reads one day of it
//! back, split by kind.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::daywindow::DayWindow;
use crate::model::{ItemKind, RawItem};
use crate::store::{to_document, DocumentStore, Query};

pub const SCRAPED_COLLECTION: &str = "scraped_data";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedBatch {
    pub tweets: Vec<RawItem>,
    pub articles: Vec<RawItem>,
}

impl FeedBatch {
    pub fn of_kind(&self, kind: ItemKind) -> &[RawItem] {
        match kind {
            ItemKind::Tweet => &self.tweets,
            ItemKind::Article => &self.articles,
        }
    }

    pub fn len(&self) -> usize {
        self.tweets.len() + self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// All items created within `window`. An unreachable source is an error;
    /// an empty day is not.
    async fn fetch(&self, window: &DayWindow) -> Result<FeedBatch>;
    fn name(&self) -> &'static str;
}

pub struct StoreFeed {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl StoreFeed {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_collection(store, SCRAPED_COLLECTION)
    }

    pub fn with_collection(store: Arc<dyn DocumentStore>, collection: &str) -> Self {
        Self {
            store,
            collection: collection.to_string(),
        }
    }

    async fn fetch_kind(&self, kind: ItemKind, window: &DayWindow) -> Result<Vec<RawItem>> {
        let query = Query::new()
            .eq("type", kind.as_str())
            .between("created", window.start, window.end);
        let docs = self
            .store
            .find(&self.collection, &query)
            .await
            .with_context(|| format!("reading {} from {}", kind.collection(), self.collection))?;

        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            let id_hint = doc.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<RawItem>(Value::Object(doc)) {
                Ok(item) => out.push(item),
                Err(e) => {
                    tracing::warn!(kind = %kind, id = %id_hint, error = %e, "skipping malformed scraped document");
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl FeedSource for StoreFeed {
    async fn fetch(&self, window: &DayWindow) -> Result<FeedBatch> {
        let tweets = self.fetch_kind(ItemKind::Tweet, window).await?;
        let articles = self.fetch_kind(ItemKind::Article, window).await?;
        Ok(FeedBatch { tweets, articles })
    }

    fn name(&self) -> &'static str {
        "store"
    }
}

/// Persist freshly captured items into the scraped collection.
pub async fn capture(store: &dyn DocumentStore, items: &[RawItem]) -> Result<usize> {
    let docs = items.iter().map(to_document).collect::<Result<Vec<_>>>()?;
    let n = docs.len();
    if n > 0 {
        store.insert_many(SCRAPED_COLLECTION, docs).await?;
    }
    Ok(n)
}
