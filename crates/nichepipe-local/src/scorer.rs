//! Score aggregation: tier weights, signal boost, category bonus, penalty, clamp.
//!
//! ```text
//! raw   = tier_score + boost + bonus
//! raw   = max(raw - penalty, 0)
//! score = round3(clamp(raw, 0, scale.max))
//! ```
//!
//! `tier_score` is the neutral score instead of the weighted sum when the profile's primary
//! tier has no keywords, so an unconfigured profile sits on the pass boundary rather than
//! rejecting everything.

use crate::extract::extract;
use crate::matcher::{any_hit, ProfileMatcher};
use crate::veto;
use nichepipe_core::{
    BoostParams, Candidate, MatchResult, PainCounting, Reason, ScoreBreakdown, ScoredCandidate,
};

/// Scores are reported with 3 decimals so equal inputs print (and compare) identically.
pub fn round_score(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Non-finite or negative knobs contribute nothing.
fn nonneg(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

/// `clamp(signal / divisor, 0, cap)`; zero when there is no usable signal.
pub fn signal_boost(signal: Option<f64>, params: Option<&BoostParams>) -> f64 {
    let (Some(signal), Some(p)) = (signal, params) else {
        return 0.0;
    };
    if !signal.is_finite() || !p.divisor.is_finite() || p.divisor <= 0.0 {
        return 0.0;
    }
    (signal / p.divisor).clamp(0.0, nonneg(p.cap))
}

/// Weighted sum over keyword-tier hits and pain-category hits.
pub fn tier_score(matcher: &ProfileMatcher, m: &MatchResult) -> f64 {
    let scoring = &matcher.profile().scoring;
    let weights = &scoring.weights;
    let mut s = 0.0;
    for (tier, kws) in &m.matched {
        s += nonneg(weights.weight(*tier)) * kws.len() as f64;
    }
    for c in &m.categories {
        let n = match scoring.pain_counting {
            PainCounting::PerCategory => 1,
            PainCounting::PerKeyword => c.keywords.len(),
        };
        s += nonneg(weights.weight(c.tier)) * n as f64;
    }
    s
}

fn vetoed(candidate: &Candidate, hit: &str) -> ScoredCandidate {
    ScoredCandidate {
        matches: MatchResult {
            candidate: candidate.clone(),
            ..Default::default()
        },
        score: 0.0,
        passed: false,
        reasons: vec![Reason::Forbidden],
        breakdown: ScoreBreakdown::default(),
        veto: Some(hit.to_string()),
        tags: Vec::new(),
        recommendation: None,
    }
}

impl ProfileMatcher {
    /// Extract → veto → match → score. Pure; identical inputs give identical output.
    pub fn score(&self, candidate: &Candidate) -> ScoredCandidate {
        let text = extract(&candidate.text).match_text();
        if let Some(hit) = veto::check(self, &text) {
            return vetoed(candidate, hit);
        }

        let m = self.match_text(candidate, &text);
        let scoring = &self.profile().scoring;
        let mut reasons = Vec::new();
        reasons.push(if m.is_empty() {
            Reason::NoMatch
        } else {
            Reason::KeywordMatch
        });

        let tier = if self.neutral {
            reasons.push(Reason::NeutralDefault);
            nonneg(scoring.neutral_score)
        } else {
            tier_score(self, &m)
        };

        let boost = signal_boost(candidate.signal, scoring.boost.as_ref());
        if boost > 0.0 {
            reasons.push(Reason::Boosted);
        }

        let bonus = match &scoring.bonus {
            Some(b) if any_hit(&text, &self.bonus).is_some() => nonneg(b.amount),
            _ => 0.0,
        };
        if bonus > 0.0 {
            reasons.push(Reason::CategoryBonus);
        }

        let penalty = match &scoring.penalty {
            Some(p) if any_hit(&text, &self.penalty).is_some() => nonneg(p.amount),
            _ => 0.0,
        };

        let mut raw = tier + boost + bonus;
        if penalty > 0.0 {
            raw = (raw - penalty).max(0.0);
            reasons.push(Reason::Penalized);
        }
        let score = round_score(raw.clamp(0.0, scoring.scale.max()));

        let passed = score >= scoring.threshold;
        if !passed {
            reasons.push(Reason::BelowThreshold);
        }

        let mut tags: Vec<String> = m
            .categories
            .iter()
            .take(scoring.max_tags)
            .map(|c| c.label.clone())
            .collect();
        if tags.is_empty() {
            if let Some(label) = &scoring.untagged_label {
                tags.push(label.clone());
            }
        }

        let recommendation = passed.then(|| self.profile().recommended_script().to_string());

        ScoredCandidate {
            matches: m,
            score,
            passed,
            reasons,
            breakdown: ScoreBreakdown {
                tier_score: round_score(tier),
                boost: round_score(boost),
                bonus: round_score(bonus),
                penalty: round_score(penalty),
            },
            veto: None,
            tags,
            recommendation,
        }
    }
}
