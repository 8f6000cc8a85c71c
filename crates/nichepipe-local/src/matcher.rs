//! Compiled profiles and tier matching.
//!
//! A [`ProfileMatcher`] is a profile with every keyword list folded and deduplicated once,
//! so scoring a batch never re-normalizes the taxonomy.

use crate::extract::extract;
use nichepipe_core::{Candidate, CategoryMatch, MatchResult, Profile, Tier};
use std::collections::{BTreeMap, BTreeSet};

/// Normalize each keyword exactly like candidate text (fold, tokenize, rejoin), so
/// punctuation inside a keyword ("18+", "e-commerce") lines up with the match text.
/// Keywords that normalize to nothing are dropped, as are repeats (first occurrence wins).
pub(crate) fn compile_keywords(raw: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for kw in raw {
        let k = extract(kw).match_text();
        if k.is_empty() {
            continue;
        }
        if seen.insert(k.clone()) {
            out.push(k);
        }
    }
    out
}

/// Keywords from `keywords` contained in `text`, in configured order.
pub(crate) fn hits<'a>(text: &str, keywords: &'a [String]) -> Vec<&'a str> {
    keywords
        .iter()
        .filter(|kw| text.contains(kw.as_str()))
        .map(|kw| kw.as_str())
        .collect()
}

pub(crate) fn any_hit<'a>(text: &str, keywords: &'a [String]) -> Option<&'a str> {
    keywords
        .iter()
        .find(|kw| text.contains(kw.as_str()))
        .map(|kw| kw.as_str())
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledCategory {
    pub(crate) label: String,
    pub(crate) tier: Tier,
    pub(crate) keywords: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProfileMatcher {
    profile: Profile,
    pub(crate) tiers: BTreeMap<Tier, Vec<String>>,
    pub(crate) pain: Vec<CompiledCategory>,
    pub(crate) forbidden: Vec<String>,
    pub(crate) bonus: Vec<String>,
    pub(crate) penalty: Vec<String>,
    /// Primary tier has nothing configured: fall back to the neutral score.
    pub(crate) neutral: bool,
}

impl ProfileMatcher {
    /// Compile a profile. Never fails; numeric sanity is `Profile::validate`'s job, and the
    /// scorer clamps whatever it is given.
    pub fn new(profile: Profile) -> Self {
        let tiers: BTreeMap<Tier, Vec<String>> = profile
            .keywords
            .iter()
            .map(|(tier, kws)| (*tier, compile_keywords(kws)))
            .filter(|(_, kws)| !kws.is_empty())
            .collect();
        let pain: Vec<CompiledCategory> = profile
            .pain_points
            .iter()
            .map(|c| CompiledCategory {
                label: c.label.clone(),
                tier: c.tier,
                keywords: compile_keywords(&c.keywords),
            })
            .filter(|c| !c.keywords.is_empty())
            .collect();
        let forbidden = compile_keywords(&profile.content_rules.forbidden_topics);
        let bonus = profile
            .scoring
            .bonus
            .as_ref()
            .map(|b| compile_keywords(&b.keywords))
            .unwrap_or_default();
        let penalty = profile
            .scoring
            .penalty
            .as_ref()
            .map(|p| compile_keywords(&p.patterns))
            .unwrap_or_default();

        let primary = profile.scoring.primary_tier;
        let neutral = !tiers.contains_key(&primary) && !pain.iter().any(|c| c.tier == primary);

        Self {
            profile,
            tiers,
            pain,
            forbidden,
            bonus,
            penalty,
            neutral,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// True when the primary tier is empty and scores fall back to the neutral value.
    pub fn is_neutral(&self) -> bool {
        self.neutral
    }

    /// Normalized keywords for one tier of the keyword taxonomy.
    pub fn tier_keywords(&self, tier: Tier) -> &[String] {
        self.tiers.get(&tier).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Test every tier keyword and pain category against an already-extracted match text.
    pub fn match_text(&self, candidate: &Candidate, text: &str) -> MatchResult {
        let mut matched = BTreeMap::new();
        for (tier, kws) in &self.tiers {
            let h = hits(text, kws);
            if !h.is_empty() {
                matched.insert(*tier, h.into_iter().map(String::from).collect());
            }
        }

        let categories = self
            .pain
            .iter()
            .filter_map(|c| {
                let h = hits(text, &c.keywords);
                if h.is_empty() {
                    None
                } else {
                    Some(CategoryMatch {
                        label: c.label.clone(),
                        tier: c.tier,
                        keywords: h.into_iter().map(String::from).collect(),
                    })
                }
            })
            .collect();

        MatchResult {
            candidate: candidate.clone(),
            matched,
            categories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;

    fn m(profile: Profile, text: &str) -> MatchResult {
        let pm = ProfileMatcher::new(profile);
        let c = Candidate::new(text);
        pm.match_text(&c, &extract(text).match_text())
    }

    #[test]
    fn compile_folds_and_dedups() {
        let raw = vec![
            "AI".to_string(),
            "ai".to_string(),
            " ".to_string(),
            "ＡＩ".to_string(),
            "职场".to_string(),
        ];
        assert_eq!(compile_keywords(&raw), vec!["ai", "职场"]);
    }

    #[test]
    fn punctuated_keywords_compile_to_match_text_form() {
        let raw = vec![
            "18+".to_string(),
            "E-Commerce".to_string(),
            "TikTok-Shop".to_string(),
            "+++".to_string(),
        ];
        // "e" is a sub-minimum token and goes, the same as it does in candidate text
        assert_eq!(compile_keywords(&raw), vec!["18", "commerce", "tiktok shop"]);
    }

    #[test]
    fn substring_containment_not_token_equality() {
        let p = Profile::named("p").with_keywords(Tier::Core, ["职场", "赚钱"]);
        let r = m(p, "职场新人必备技能");
        assert_eq!(r.matched[&Tier::Core], vec!["职场"]);
    }

    #[test]
    fn multi_word_keywords_match_across_token_boundaries() {
        let p = Profile::named("p").with_keywords(Tier::LongTail, ["tiktok shop"]);
        let r = m(p, "TikTok-Shop 新政策");
        assert_eq!(r.matched[&Tier::LongTail], vec!["tiktok shop"]);
    }

    #[test]
    fn tiers_without_hits_are_absent() {
        let p = Profile::named("p")
            .with_keywords(Tier::Core, ["职场"])
            .with_keywords(Tier::Trigger, ["必备"]);
        let r = m(p, "职场新人");
        assert!(r.matched.contains_key(&Tier::Core));
        assert!(!r.matched.contains_key(&Tier::Trigger));
    }

    #[test]
    fn pain_categories_record_all_hit_keywords() {
        let r = m(Profile::ecommerce_pain(), "物流费用涨价");
        let cost = r
            .categories
            .iter()
            .find(|c| c.label == "成本高")
            .expect("成本高 should match");
        assert_eq!(cost.tier, Tier::Major);
        assert_eq!(cost.keywords, vec!["费用", "涨价", "物流"]);
    }

    #[test]
    fn neutral_when_primary_tier_is_empty() {
        let pm = ProfileMatcher::new(Profile::named("p").with_keywords(Tier::Core, [""; 0]));
        assert!(pm.is_neutral());
        let pm = ProfileMatcher::new(Profile::named("p").with_keywords(Tier::Core, ["  "]));
        assert!(pm.is_neutral());
        let pm = ProfileMatcher::new(Profile::builtin_default());
        assert!(!pm.is_neutral());
        let pm = ProfileMatcher::new(Profile::ecommerce_pain());
        assert!(!pm.is_neutral());
    }
}
