// src/config.rs
//! Pipeline configuration.
//!
//! Resolution order:
//! 1) $SENTIMENT_CONFIG_PATH
//! 2) config/pipeline.toml
//! 3) built-in defaults
//!
//! then env overrides (`SENTIMENT_STORE_DIR`, `SENTIMENT_WORKERS`,
//! `SENTIMENT_UTC_OFFSET`) are applied on top.

use anyhow::{anyhow, Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::daywindow::parse_offset;
use crate::validate::{Validator, DEFAULT_MAX_CHARS, DEFAULT_MIN_WORDS};

pub const ENV_CONFIG_PATH: &str = "SENTIMENT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_STORE_DIR: &str = "SENTIMENT_STORE_DIR";
pub const ENV_WORKERS: &str = "SENTIMENT_WORKERS";
pub const ENV_UTC_OFFSET: &str = "SENTIMENT_UTC_OFFSET";

fn default_store_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_utc_offset() -> String {
    "+02:00".to_string()
}
fn default_workers() -> usize {
    4
}
fn default_worker_timeout_ms() -> u64 {
    30_000
}
fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}
fn default_min_words() -> usize {
    DEFAULT_MIN_WORDS
}
fn default_tweet_profile() -> ClassifierProfile {
    ClassifierProfile::lexicon("ElKulako/cryptobert")
}
fn default_article_profile() -> ClassifierProfile {
    ClassifierProfile::lexicon("ProsusAI/finbert")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Http,
    #[default]
    Lexicon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierProfile {
    #[serde(default)]
    pub backend: Backend,
    /// Inference URL, required for `backend = "http"`.
    #[serde(default)]
    pub endpoint: Option<String>,
    pub model: String,
    /// Forward pre-tokenized inputs when every item carries one.
    #[serde(default)]
    pub prepared_inputs: bool,
}

impl ClassifierProfile {
    pub fn lexicon(model: &str) -> Self {
        Self {
            backend: Backend::Lexicon,
            endpoint: None,
            model: model.to_string(),
            prepared_inputs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    /// Fixed offset defining the daily window, e.g. "+02:00".
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_worker_timeout_ms")]
    pub worker_timeout_ms: u64,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_min_words")]
    pub min_words: usize,
    #[serde(default = "default_tweet_profile")]
    pub tweets: ClassifierProfile,
    #[serde(default = "default_article_profile")]
    pub articles: ClassifierProfile,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            utc_offset: default_utc_offset(),
            workers: default_workers(),
            worker_timeout_ms: default_worker_timeout_ms(),
            max_chars: default_max_chars(),
            min_words: default_min_words(),
            tweets: default_tweet_profile(),
            articles: default_article_profile(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing pipeline config")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// File (env path, then default path, then built-ins) plus env overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Invalid override values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(ENV_STORE_DIR) {
            if !dir.trim().is_empty() {
                self.store_dir = PathBuf::from(dir.trim());
            }
        }
        if let Ok(raw) = std::env::var(ENV_WORKERS) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n >= 1 => self.workers = n,
                _ => tracing::warn!(value = %raw, "ignoring invalid {ENV_WORKERS}"),
            }
        }
        if let Ok(raw) = std::env::var(ENV_UTC_OFFSET) {
            match parse_offset(&raw) {
                Ok(_) => self.utc_offset = raw.trim().to_string(),
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring invalid {ENV_UTC_OFFSET}"),
            }
        }
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        parse_offset(&self.utc_offset)
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_timeout_ms)
    }

    pub fn validator(&self) -> Validator {
        Validator::new(self.max_chars, self.min_words)
    }
}
