// src/validate.rs
//! Eligibility rules for captured items.
//!
//! An item is kept only if it is not a repost (tweets only), its normalized
//! text is shorter than `max_chars`, and it has at least `min_words` words.
//! Over-long items are dropped rather than truncated: the classifier would
//! truncate silently and skew its confidence. Within a batch each id counts
//! once, so a scraper that captured the same post twice cannot skew the day.

use std::collections::HashSet;
use std::fmt;

use metrics::counter;

use crate::model::{ItemKind, RawItem, ValidatedItem};
use crate::text::{normalize, word_count};

pub const DEFAULT_MAX_CHARS: usize = 128;
pub const DEFAULT_MIN_WORDS: usize = 3;
pub const REPOST_PREFIX: &str = "RT ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Repost,
    /// Same id as an earlier item of the batch; the first copy wins.
    Duplicate,
    Empty,
    TooLong { chars: usize, max: usize },
    TooFewWords { words: usize, min: usize },
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::Repost => "repost",
            Rejection::Duplicate => "duplicate",
            Rejection::Empty => "empty",
            Rejection::TooLong { .. } => "too_long",
            Rejection::TooFewWords { .. } => "too_few_words",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Repost => write!(f, "repost"),
            Rejection::Duplicate => write!(f, "duplicate id"),
            Rejection::Empty => write!(f, "empty after normalization"),
            Rejection::TooLong { chars, max } => write!(f, "{chars} chars (max {max})"),
            Rejection::TooFewWords { words, min } => write!(f, "{words} words (min {min})"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Validator {
    pub max_chars: usize,
    pub min_words: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            min_words: DEFAULT_MIN_WORDS,
        }
    }
}

impl Validator {
    pub fn new(max_chars: usize, min_words: usize) -> Self {
        Self {
            max_chars,
            min_words,
        }
    }

    /// Check the rules against the raw item and its normalized content.
    /// The repost marker is matched on the raw text (normalization lowercases it).
    pub fn check(&self, raw: &RawItem, normalized: &str) -> Result<(), Rejection> {
        if raw.kind == ItemKind::Tweet && raw.content.starts_with(REPOST_PREFIX) {
            return Err(Rejection::Repost);
        }
        if normalized.trim().is_empty() {
            return Err(Rejection::Empty);
        }
        let chars = normalized.chars().count();
        if chars >= self.max_chars {
            return Err(Rejection::TooLong {
                chars,
                max: self.max_chars,
            });
        }
        let words = word_count(normalized);
        if words < self.min_words {
            return Err(Rejection::TooFewWords {
                words,
                min: self.min_words,
            });
        }
        Ok(())
    }

    pub fn is_eligible(&self, raw: &RawItem) -> bool {
        self.check(raw, &normalize(&raw.content)).is_ok()
    }

    /// Normalize and validate one item, producing a `ValidatedItem` on success.
    pub fn validate(&self, raw: RawItem) -> Result<ValidatedItem, (RawItem, Rejection)> {
        let normalized = normalize(&raw.content);
        match self.check(&raw, &normalized) {
            Ok(()) => Ok(ValidatedItem::accept(raw, normalized)),
            Err(why) => Err((raw, why)),
        }
    }

    /// Validate a batch, preserving input order. Repeated ids are dropped
    /// (first copy kept, even if it fails validation). Rejections are logged
    /// and counted, never raised. Returns (kept, rejected_count).
    pub fn validate_batch(&self, items: Vec<RawItem>) -> (Vec<ValidatedItem>, usize) {
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut kept = Vec::with_capacity(items.len());
        let mut rejected = 0usize;
        for raw in items {
            let verdict = if seen_ids.insert(raw.id.clone()) {
                self.validate(raw)
            } else {
                Err((raw, Rejection::Duplicate))
            };
            match verdict {
                Ok(item) => kept.push(item),
                Err((raw, why)) => {
                    rejected += 1;
                    tracing::debug!(
                        id = %raw.id,
                        kind = %raw.kind,
                        reason = %why,
                        "item rejected"
                    );
                    counter!("pipeline_items_rejected_total", "reason" => why.reason()).increment(1);
                }
            }
        }
        (kept, rejected)
    }
}
