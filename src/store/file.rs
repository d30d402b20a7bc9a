// src/store/file.rs
//! JSON-file backend: one array per collection at `<dir>/<collection>.json`.
//! Writes go to a temp file and are renamed into place. Every write rewrites
//! the whole collection, so callers batch with `insert_many`/`upsert_many`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;

use super::{apply_upsert, apply_upserts, insert_with_id, Document, DocumentStore, Query, UpsertOutcome};

pub struct JsonFileStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).with_context(|| format!("creating store dir {}", dir.display()))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, collection: &str) -> Result<PathBuf> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            bail!("invalid collection name {collection:?}");
        }
        Ok(self.dir.join(format!("{collection}.json")))
    }

    fn load(&self, collection: &str) -> Result<Vec<Document>> {
        let path = self.path(collection)?;
        let s = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        serde_json::from_str(&s).with_context(|| format!("parsing {}", path.display()))
    }

    fn save(&self, collection: &str, docs: &[Document]) -> Result<()> {
        let path = self.path(collection)?;
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(docs)?;
        let mut f = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(&json)?;
        f.sync_all()?;
        fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    fn modify<R>(&self, collection: &str, f: impl FnOnce(&mut Vec<Document>) -> R) -> Result<R> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("file store lock poisoned"))?;
        let mut docs = self.load(collection)?;
        let out = f(&mut docs);
        self.save(collection, &docs)?;
        Ok(out)
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let docs = self.load(collection)?;
        Ok(docs.into_iter().filter(|d| query.matches(d)).collect())
    }

    async fn insert_one(&self, collection: &str, doc: Document) -> Result<()> {
        self.modify(collection, |docs| insert_with_id(docs, doc))
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<()> {
        self.modify(collection, |existing| {
            for d in docs {
                insert_with_id(existing, d);
            }
        })
    }

    async fn upsert(&self, collection: &str, query: &Query, doc: Document) -> Result<UpsertOutcome> {
        self.modify(collection, |docs| apply_upsert(docs, query, doc))
    }

    async fn upsert_many(&self, collection: &str, ops: Vec<(Query, Document)>) -> Result<Vec<UpsertOutcome>> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }
        self.modify(collection, |docs| apply_upserts(docs, ops))
    }
}
