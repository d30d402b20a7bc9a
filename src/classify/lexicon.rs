// src/classify/lexicon.rs
//! Offline lexicon classifier. Scores tokens against an embedded crypto
//! lexicon; a negator flips the sign of the three words that follow it.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;

use super::{Batch, Classifier, Prediction};
use crate::model::Label;

const EMBEDDED_LEXICON: &str = include_str!("../../crypto_lexicon.json");
/// How many tokens after a negator have their sign flipped.
const NEGATION_REACH: u8 = 3;
const NEGATORS: &[&str] = &[
    "not", "no", "never", "isn't", "wasn't", "aren't", "won't", "can't", "cannot", "without",
];

fn embedded_lexicon() -> Result<&'static HashMap<String, i32>> {
    static LEXICON: OnceCell<HashMap<String, i32>> = OnceCell::new();
    LEXICON.get_or_try_init(|| serde_json::from_str(EMBEDDED_LEXICON).context("parsing embedded crypto lexicon"))
}

#[derive(Debug, Clone)]
pub struct LexiconClassifier {
    profile: String,
    words: &'static HashMap<String, i32>,
}

/// Lexicon tally for one text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub score: i32,
    pub tokens: usize,
}

impl Tally {
    fn into_prediction(self) -> Prediction {
        let label = match self.score.signum() {
            1 => Label::Bullish,
            -1 => Label::Bearish,
            _ => Label::Neutral,
        };
        if label == Label::Neutral {
            return Prediction::new(label, 0.5);
        }
        // Denser lexicon hits push polar confidence from 0.5 towards 1.0.
        let density = self.score.unsigned_abs() as f64 / self.tokens.max(1) as f64;
        Prediction::new(label, 0.5 + 0.5 * density.min(1.0))
    }
}

impl LexiconClassifier {
    pub fn new(profile: &str) -> Result<Self> {
        Ok(Self {
            profile: format!("lexicon:{profile}"),
            words: embedded_lexicon()?,
        })
    }

    /// Single pass over the tokens; a negator flips the next `NEGATION_REACH` words.
    pub fn tally(&self, text: &str) -> Tally {
        let (tally, _) = tokenize(text).fold((Tally::default(), 0u8), |(mut tally, reach), tok| {
            tally.tokens += 1;
            if NEGATORS.contains(&tok.as_str()) {
                return (tally, NEGATION_REACH);
            }
            let weight = self.words.get(&tok).copied().unwrap_or(0);
            tally.score += if reach > 0 { -weight } else { weight };
            (tally, reach.saturating_sub(1))
        });
        tally
    }

    pub fn predict(&self, text: &str) -> Prediction {
        self.tally(text).into_prediction()
    }
}

#[async_trait]
impl Classifier for LexiconClassifier {
    async fn classify(&self, batch: Batch) -> Result<Vec<Prediction>> {
        match batch {
            Batch::Raw(texts) => Ok(texts.iter().map(|t| self.predict(t)).collect()),
            Batch::Prepared(_) => bail!("lexicon classifier needs raw text, got token ids"),
        }
    }

    fn profile(&self) -> &str {
        &self.profile
    }
}

/// Lower-case alphanumeric tokens; apostrophes stay so "isn't" survives.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_lexicon_loads_once() {
        let a = embedded_lexicon().unwrap();
        let b = embedded_lexicon().unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.get("moon"), Some(&3));
        assert!(NEGATORS.iter().all(|n| !a.contains_key(*n)));
    }

    #[test]
    fn polar_and_neutral_labels() {
        let c = LexiconClassifier::new("test").unwrap();
        assert_eq!(c.predict("btc pumping hard today bullish").label, Label::Bullish);
        assert_eq!(c.predict("exchange hacked, funds rekt").label, Label::Bearish);
        assert_eq!(c.predict("fees are average this week").label, Label::Neutral);
    }

    #[test]
    fn negation_flips_sign() {
        let c = LexiconClassifier::new("test").unwrap();
        assert_eq!(c.predict("this is not bullish at all").label, Label::Bearish);
        let t = c.tally("never going to crash");
        assert!(t.score > 0);
        assert_eq!(t.tokens, 4);
        // Reach ends after three words.
        assert!(c.tally("not that it will ever crash").score < 0);
    }

    #[test]
    fn confidence_stays_in_unit_interval() {
        let c = LexiconClassifier::new("test").unwrap();
        let p = c.predict("moon moon moon");
        assert!(p.confidence <= 1.0 && p.confidence > 0.5);
    }

    #[tokio::test]
    async fn prepared_batches_are_refused() {
        let c = LexiconClassifier::new("test").unwrap();
        let out = c.classify(Batch::Prepared(vec![])).await;
        assert!(out.is_err());
    }
}
