// src/text.rs
//! Text normalization applied to every captured item before validation.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)https?://\S+").unwrap());
static RE_HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#+(\w+)").unwrap());
static RE_CASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$([A-Za-z][A-Za-z0-9_]*)\b").unwrap());
static RE_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]+").unwrap());

/// Normalize post text. Steps, in order:
/// 1) remove URLs
/// 2) strip hashtag markers, keep the word
/// 3) strip cashtag markers, keep the symbol
/// 4) lowercase
/// 5) collapse newline runs into one space
///
/// Total and idempotent. A removal can expose a new marker (`#$btc`,
/// `#https://...`), so the pass repeats until the text is stable; every
/// repeat only deletes characters, which bounds the loop.
pub fn normalize(text: &str) -> String {
    let mut current = normalize_pass(text);
    loop {
        let next = normalize_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_pass(text: &str) -> String {
    let out = RE_URL.replace_all(text, "");
    let out = RE_HASHTAG.replace_all(&out, "$1");
    let out = RE_CASHTAG.replace_all(&out, "$1");
    let out = out.to_lowercase();
    RE_NEWLINES.replace_all(&out, " ").into_owned()
}

/// Whitespace-separated word count, as used by the validator.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
