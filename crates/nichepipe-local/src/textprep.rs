//! Minimal, deterministic text normalization helpers.
//!
//! Everything the matcher compares goes through [`fold`]: keywords, candidate text,
//! forbidden topics and dedup keys. Keeping one folding policy is what makes substring
//! containment meaningful across sources.

use unicode_normalization::UnicodeNormalization;

/// Case/width fold used for matching keys.
///
/// - NFKC (full-width Latin/digits become ASCII, compatibility forms collapse)
/// - lowercase
///
/// Lossy; used only for matching, never for display.
pub fn fold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.nfkc() {
        for lc in ch.to_lowercase() {
            out.push(lc);
        }
    }
    out
}

/// Dedup key: trimmed, folded text.
pub fn canonical_key(s: &str) -> String {
    fold(s.trim()).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_lowercases_and_narrows_full_width() {
        assert_eq!(fold("ＡＩ客服"), "ai客服");
        assert_eq!(fold("TikTok Shop"), "tiktok shop");
        assert_eq!(fold("１６８８涨价"), "1688涨价");
    }

    #[test]
    fn fold_leaves_ideographs_alone() {
        assert_eq!(fold("职场新人必备技能"), "职场新人必备技能");
    }

    #[test]
    fn canonical_key_trims_after_folding() {
        // U+3000 IDEOGRAPHIC SPACE is whitespace and NFKC maps it to a plain space.
        assert_eq!(canonical_key("\u{3000} Hello World  "), "hello world");
        assert_eq!(canonical_key("  职场 "), canonical_key("职场"));
        assert_eq!(canonical_key(""), "");
    }
}
