//! Keyword extraction: raw text → folded token set.

use crate::textprep;
use std::collections::BTreeSet;

/// Tokens shorter than this (in chars) are dropped.
pub const MIN_TOKEN_CHARS: usize = 2;

/// Function words that never carry topic signal. Compared after folding.
pub const STOPWORDS: &[&str] = &[
    "的", "了", "是", "在", "和", "与", "及", "或", "等", "这", "那", "有", "没", "不", "the", "and",
    "or", "of", "to", "in", "is", "an",
];

fn is_stopword(tok: &str) -> bool {
    STOPWORDS.contains(&tok)
}

/// Extracted tokens in first-occurrence order, without repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keywords {
    tokens: Vec<String>,
}

impl Keywords {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn as_set(&self) -> BTreeSet<&str> {
        self.tokens.iter().map(|t| t.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Tokens joined by single spaces. All keyword containment tests run against this.
    pub fn match_text(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Split folded text into maximal alphanumeric runs.
///
/// Ideographic scripts have no spaces, so a CJK run stays one token; keywords are matched
/// by substring containment, not token equality, which is what makes that workable.
fn tokenize(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            cur.push(ch);
        } else if !cur.is_empty() {
            out.push(std::mem::take(&mut cur));
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

pub fn extract(text: &str) -> Keywords {
    let folded = textprep::fold(text);
    let mut seen = BTreeSet::new();
    let mut tokens = Vec::new();
    for t in tokenize(&folded) {
        if t.chars().count() < MIN_TOKEN_CHARS || is_stopword(&t) {
            continue;
        }
        if seen.insert(t.clone()) {
            tokens.push(t);
        }
    }
    Keywords { tokens }
}
