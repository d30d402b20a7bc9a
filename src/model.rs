//! Data model shared by every pipeline stage.
//!
//! `RawItem` is what the feed captured. `ValidatedItem` can only be built by the
//! validator, so holding one means the item already passed the eligibility rules.
//! `DailySentiment` is the durable per-day artifact.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::classify::PreparedInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Tweet,
    Article,
}

impl ItemKind {
    pub const ALL: [ItemKind; 2] = [ItemKind::Tweet, ItemKind::Article];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Tweet => "tweet",
            ItemKind::Article => "article",
        }
    }

    /// Collection holding classified items of this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            ItemKind::Tweet => "tweets",
            ItemKind::Article => "articles",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A post or article as captured by the feed. Never mutated after capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    #[serde(deserialize_with = "id_from_str_or_int")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(
        default,
        deserialize_with = "opt_id_from_str_or_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub author_id: Option<String>,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
    pub content: String,
    /// Pre-tokenized model input captured alongside the text, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepared: Option<PreparedInput>,
}

impl RawItem {
    pub fn tweet(id: impl Into<String>, created_at: DateTime<Utc>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Tweet,
            author_id: None,
            created_at,
            content: content.into(),
            prepared: None,
        }
    }

    pub fn article(id: impl Into<String>, created_at: DateTime<Utc>, content: impl Into<String>) -> Self {
        Self {
            kind: ItemKind::Article,
            ..Self::tweet(id, created_at, content)
        }
    }
}

/// Raw item whose content is normalized and known to be eligible.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedItem {
    id: String,
    kind: ItemKind,
    author_id: Option<String>,
    created_at: DateTime<Utc>,
    content: String,
    prepared: Option<PreparedInput>,
}

impl ValidatedItem {
    /// Only the validator calls this, after the eligibility checks passed.
    pub(crate) fn accept(raw: RawItem, normalized: String) -> Self {
        Self {
            id: raw.id,
            kind: raw.kind,
            author_id: raw.author_id,
            created_at: raw.created_at,
            content: normalized,
            prepared: raw.prepared,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn author_id(&self) -> Option<&str> {
        self.author_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn prepared(&self) -> Option<&PreparedInput> {
        self.prepared.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Bullish,
    Neutral,
    Bearish,
}

impl Label {
    /// Map a model label onto the shared vocabulary. Finance models answer
    /// positive/neutral/negative, crypto models Bullish/Neutral/Bearish.
    pub fn parse(s: &str) -> Option<Label> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" | "positive" => Some(Label::Bullish),
            "neutral" => Some(Label::Neutral),
            "bearish" | "negative" => Some(Label::Bearish),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Bullish => "Bullish",
            Label::Neutral => "Neutral",
            Label::Bearish => "Bearish",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub item_id: String,
    pub label: Label,
    /// Model confidence in [0,1]. Reported, never weighted into the score.
    pub confidence: f64,
}

/// One record per calendar day in `daily_sentiment`, keyed by `day`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySentiment {
    pub day: NaiveDate,
    #[serde(rename = "positive_tweets")]
    pub positive_count: u32,
    #[serde(rename = "neutral_tweets")]
    pub neutral_count: u32,
    #[serde(rename = "negative_tweets")]
    pub negative_count: u32,
    pub sentiment_score: f64,
}

impl DailySentiment {
    /// False for a quiet day: the record exists but no item leaned either way.
    pub fn has_signal(&self) -> bool {
        self.positive_count + self.negative_count > 0
    }
}

/// Classified item as persisted in its kind's collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
    pub content: String,
    pub sentiment: Label,
    pub confidence: f64,
}

impl StoredItem {
    pub fn new(item: &ValidatedItem, classification: &Classification) -> Self {
        Self {
            id: item.id.clone(),
            kind: item.kind,
            author_id: item.author_id.clone(),
            created_at: item.created_at,
            content: item.content.clone(),
            sentiment: classification.label,
            confidence: classification.confidence,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnyId {
    Str(String),
    Int(u64),
}

impl From<AnyId> for String {
    fn from(id: AnyId) -> Self {
        match id {
            AnyId::Str(s) => s,
            AnyId::Int(n) => n.to_string(),
        }
    }
}

// Scraped tweet ids arrive as integers; everything downstream keys on strings.
fn id_from_str_or_int<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    AnyId::deserialize(d).map(String::from)
}

fn opt_id_from_str_or_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<AnyId>::deserialize(d)?.map(String::from))
}
