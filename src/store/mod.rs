// src/store/mod.rs
//! Document store abstraction.
//!
//! Documents are JSON objects. All pipeline writes go through `upsert`, which
//! makes reruns of the same day overwrite instead of duplicate.

pub mod file;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub use file::JsonFileStore;
pub use memory::MemoryStore;

pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    /// Half-open instant range `[from, to)` over an RFC 3339 string field.
    Between {
        field: String,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

impl Filter {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq(field, value) => doc.get(field) == Some(value),
            Filter::Between { field, from, to } => doc
                .get(field)
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
                .is_some_and(|t| *from <= t && t < *to),
        }
    }
}

/// Conjunction of filters. The empty query matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    filters: Vec<Filter>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.to_string(), value.into()));
        self
    }

    pub fn between(mut self, field: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.filters.push(Filter::Between {
            field: field.to_string(),
            from,
            to,
        });
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Equality fields, copied into a document created by an upsert.
    fn seed(&self) -> Document {
        let mut doc = Document::new();
        for f in &self.filters {
            if let Filter::Eq(k, v) = f {
                doc.insert(k.clone(), v.clone());
            }
        }
        doc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;

    async fn find_one(&self, collection: &str, query: &Query) -> Result<Option<Document>> {
        Ok(self.find(collection, query).await?.into_iter().next())
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> Result<()>;

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<()>;

    /// Merge `doc` into the first document matching `query`, or insert the
    /// query's equality fields plus `doc`. Any `_id` in `doc` is ignored.
    async fn upsert(&self, collection: &str, query: &Query, doc: Document) -> Result<UpsertOutcome>;

    /// Apply `upsert` for each pair in order. Backends override this to write
    /// the batch in one pass.
    async fn upsert_many(&self, collection: &str, ops: Vec<(Query, Document)>) -> Result<Vec<UpsertOutcome>> {
        let mut outcomes = Vec::with_capacity(ops.len());
        for (query, doc) in ops {
            outcomes.push(self.upsert(collection, &query, doc).await?);
        }
        Ok(outcomes)
    }
}

/// Serialize a value into a store document; the value must be a JSON object.
pub fn to_document<T: serde::Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected a JSON object, got {other}"),
    }
}

// Shared by the backends: ids are a per-collection sequence (documents are never deleted).
fn insert_with_id(docs: &mut Vec<Document>, mut doc: Document) {
    let next = docs.len() as u64 + 1;
    doc.insert(ID_FIELD.to_string(), Value::from(next));
    docs.push(doc);
}

fn apply_upsert(docs: &mut Vec<Document>, query: &Query, mut doc: Document) -> UpsertOutcome {
    doc.remove(ID_FIELD);
    if let Some(existing) = docs.iter_mut().find(|d| query.matches(d)) {
        for (k, v) in doc {
            existing.insert(k, v);
        }
        return UpsertOutcome::Updated;
    }
    let mut fresh = query.seed();
    fresh.extend(doc);
    insert_with_id(docs, fresh);
    UpsertOutcome::Inserted
}

fn apply_upserts(docs: &mut Vec<Document>, ops: Vec<(Query, Document)>) -> Vec<UpsertOutcome> {
    ops.into_iter()
        .map(|(query, doc)| apply_upsert(docs, &query, doc))
        .collect()
}
