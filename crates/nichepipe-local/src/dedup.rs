//! Cross-source deduplication.
//!
//! First-seen-wins on the canonical key. Source precedence is simply the order the caller
//! hands batches in; survivors keep their first-occurrence order.

use crate::textprep::canonical_key;
use nichepipe_core::{Candidate, SourceBatch};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deduped {
    pub candidates: Vec<Candidate>,
    pub removed: usize,
}

pub fn dedup(candidates: impl IntoIterator<Item = Candidate>) -> Deduped {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    let mut removed = 0usize;
    for c in candidates {
        if seen.insert(canonical_key(&c.text)) {
            out.push(c);
        } else {
            removed += 1;
        }
    }
    Deduped {
        candidates: out,
        removed,
    }
}

/// Concatenate batches in the given order, then dedup. Candidates without a source label
/// inherit their batch's.
pub fn merge(batches: Vec<SourceBatch>) -> Deduped {
    dedup(batches.into_iter().flat_map(|b| {
        let label = b.source;
        b.candidates.into_iter().map(move |mut c| {
            if c.source.is_none() && !label.is_empty() {
                c.source = Some(label.clone());
            }
            c
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(source: &str, texts: &[&str]) -> SourceBatch {
        SourceBatch {
            source: source.to_string(),
            candidates: texts.iter().map(|t| Candidate::new(*t)).collect(),
        }
    }

    #[test]
    fn first_source_wins() {
        let d = merge(vec![
            batch("huxiu", &["AI客服替代人工", "物流费用涨价"]),
            batch("36kr", &["  ai客服替代人工 ", "拼多多仅退款升级"]),
        ]);
        assert_eq!(d.removed, 1);
        let texts: Vec<_> = d.candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["AI客服替代人工", "物流费用涨价", "拼多多仅退款升级"]);
        assert_eq!(d.candidates[0].source.as_deref(), Some("huxiu"));
        assert_eq!(d.candidates[2].source.as_deref(), Some("36kr"));
    }

    #[test]
    fn caller_order_decides_precedence() {
        let d = merge(vec![batch("36kr", &["Same title"]), batch("huxiu", &["same TITLE"])]);
        assert_eq!(d.candidates.len(), 1);
        assert_eq!(d.candidates[0].source.as_deref(), Some("36kr"));
        assert_eq!(d.candidates[0].text, "Same title");
    }

    #[test]
    fn explicit_source_label_is_kept() {
        let mut b = batch("feed", &["x"]);
        b.candidates[0].source = Some("weibo".to_string());
        let d = merge(vec![b]);
        assert_eq!(d.candidates[0].source.as_deref(), Some("weibo"));
    }

    #[test]
    fn within_batch_repeats_and_empty_input() {
        let d = dedup(vec![Candidate::new("a"), Candidate::new("b"), Candidate::new("A ")]);
        assert_eq!(d.candidates.len(), 2);
        assert_eq!(d.removed, 1);
        assert_eq!(dedup(Vec::new()), Deduped::default());
    }
}
