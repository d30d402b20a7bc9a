// src/store/memory.rs
use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{apply_upsert, apply_upserts, insert_with_id, Document, DocumentStore, Query, UpsertOutcome};

/// In-process store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection` (0 if it does not exist).
    pub fn count(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .map(|g| g.get(collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn with_collection<R>(&self, collection: &str, f: impl FnOnce(&mut Vec<Document>) -> R) -> Result<R> {
        let mut g = self
            .inner
            .lock()
            .map_err(|_| anyhow!("memory store mutex poisoned"))?;
        Ok(f(g.entry(collection.to_string()).or_default()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        self.with_collection(collection, |docs| {
            docs.iter().filter(|d| query.matches(d)).cloned().collect()
        })
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> Result<()> {
        self.with_collection(collection, |docs| insert_with_id(docs, doc))
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<()> {
        self.with_collection(collection, |existing| {
            for d in docs {
                insert_with_id(existing, d);
            }
        })
    }

    async fn upsert(&self, collection: &str, query: &Query, doc: Document) -> Result<UpsertOutcome> {
        self.with_collection(collection, |docs| apply_upsert(docs, query, doc))
    }

    async fn upsert_many(&self, collection: &str, ops: Vec<(Query, Document)>) -> Result<Vec<UpsertOutcome>> {
        self.with_collection(collection, |docs| apply_upserts(docs, ops))
    }
}
