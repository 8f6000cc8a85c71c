//! Ranking: keep passing candidates, stable sort by score, truncate.

use nichepipe_core::ScoredCandidate;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    pub results: Vec<ScoredCandidate>,
    pub total_input: usize,
    pub passed_count: usize,
    pub returned_count: usize,
}

/// Never mutates `scored`. Ties keep arrival order (`sort_by` is stable).
pub fn rank(scored: &[ScoredCandidate], max_results: usize) -> Ranking {
    let mut results: Vec<ScoredCandidate> = scored.iter().filter(|s| s.passed).cloned().collect();
    let passed_count = results.len();
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(max_results);
    Ranking {
        returned_count: results.len(),
        results,
        total_input: scored.len(),
        passed_count,
    }
}
