// src/classify/mod.rs
//! Classification service abstraction.
//!
//! One `Classifier` trait, two configured instances (tweets, articles) that
//! share the Bullish/Neutral/Bearish vocabulary. Backends are chosen by
//! configuration, see `build_classifier`.

pub mod http;
pub mod lexicon;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Backend, ClassifierProfile};
use crate::model::Label;

pub use http::HttpClassifier;
pub use lexicon::LexiconClassifier;

/// Pre-tokenized model input (token ids + attention mask of equal length).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedInput {
    pub input_ids: Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl PreparedInput {
    pub fn is_well_formed(&self) -> bool {
        !self.input_ids.is_empty() && self.input_ids.len() == self.attention_mask.len()
    }
}

/// One unit of work handed to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierInput {
    Text(String),
    Prepared(PreparedInput),
}

/// What a classifier receives: a uniform batch, never a mix of representations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Batch {
    Raw(Vec<String>),
    Prepared(Vec<PreparedInput>),
}

impl Batch {
    pub fn len(&self) -> usize {
        match self {
            Batch::Raw(v) => v.len(),
            Batch::Prepared(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Label + confidence for one input, same position as the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Label,
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: Label, confidence: f64) -> Self {
        Self {
            label,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a batch. Must return exactly one prediction per input, same order.
    async fn classify(&self, batch: Batch) -> Result<Vec<Prediction>>;
    /// Profile name for diagnostics (e.g. the model id).
    fn profile(&self) -> &str;
}

pub type DynClassifier = Arc<dyn Classifier>;

/// Factory: build a classifier from a configured profile.
///
/// * `lexicon` needs nothing and runs offline.
/// * `http` needs an `endpoint`; requests time out after `timeout`.
pub fn build_classifier(profile: &ClassifierProfile, timeout: Duration) -> Result<DynClassifier> {
    match profile.backend {
        Backend::Lexicon => Ok(Arc::new(LexiconClassifier::new(&profile.model)?)),
        Backend::Http => {
            let Some(endpoint) = profile.endpoint.as_deref() else {
                bail!("http classifier profile {:?} has no endpoint", profile.model);
            };
            Ok(Arc::new(HttpClassifier::new(endpoint, &profile.model, timeout)?))
        }
    }
}
