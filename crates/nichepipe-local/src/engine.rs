//! The batch pipeline and the profile-holding engine.
//!
//! ```text
//! Candidates → (extract → veto → match → score, per candidate, parallel) → rank → RunResult
//! SourceBatch* → merge/dedup (sequential) → ...same...
//! ```
//!
//! Per-candidate work only reads the candidate and the compiled profile, so a batch can be
//! scored on a worker pool without locks; ranking needs the whole batch and runs once.

use crate::dedup;
use crate::matcher::ProfileMatcher;
use crate::rank::rank;
use crate::textprep;
use nichepipe_core::{
    Candidate, Profile, ProfileBatch, ProfileStore, RunResult, ScoredCandidate, SkippedProfile,
    SourceBatch, DEFAULT_PROFILE_NAME,
};
use std::collections::BTreeSet;

/// Score one candidate against one profile.
///
/// Compiles the profile on every call; hold a [`ProfileMatcher`] (or an [`Engine`]) when
/// scoring more than a handful of candidates.
pub fn score(candidate: &Candidate, profile: &Profile) -> ScoredCandidate {
    ProfileMatcher::new(profile.clone()).score(candidate)
}

/// Score a batch against one profile and rank it.
pub fn run(candidates: &[Candidate], profile: &Profile, max_results: usize) -> RunResult {
    ProfileMatcher::new(profile.clone()).run(candidates, max_results)
}

/// Candidates whose folded text contains the folded query, in input order.
pub fn search_related<'a>(query: &str, candidates: &'a [Candidate]) -> Vec<&'a Candidate> {
    let q = textprep::fold(query.trim());
    if q.is_empty() {
        return Vec::new();
    }
    candidates
        .iter()
        .filter(|c| textprep::fold(&c.text).contains(&q))
        .collect()
}

impl ProfileMatcher {
    /// Results come back in input order whether or not the `parallel` feature is on.
    pub fn score_batch(&self, candidates: &[Candidate]) -> Vec<ScoredCandidate> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            candidates.par_iter().map(|c| self.score(c)).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            candidates.iter().map(|c| self.score(c)).collect()
        }
    }

    pub fn run(&self, candidates: &[Candidate], max_results: usize) -> RunResult {
        if candidates.is_empty() {
            return RunResult::empty(self.name());
        }
        let scored = self.score_batch(candidates);
        let ranking = rank(&scored, max_results);
        tracing::debug!(
            profile = self.name(),
            total = ranking.total_input,
            passed = ranking.passed_count,
            returned = ranking.returned_count,
            "scored batch"
        );
        RunResult {
            profile_name: self.name().to_string(),
            total_input: ranking.total_input,
            passed_count: ranking.passed_count,
            returned_count: ranking.returned_count,
            duplicates_removed: 0,
            results: ranking.results,
        }
    }

    /// Merge sources in the given order (first-seen-wins), then score and rank.
    ///
    /// `total_input` counts the batch after deduplication.
    pub fn run_merged(&self, batches: Vec<SourceBatch>, max_results: usize) -> RunResult {
        let merged = dedup::merge(batches);
        let mut out = self.run(&merged.candidates, max_results);
        out.duplicates_removed = merged.removed;
        out
    }
}

/// Holds every loaded profile for the lifetime of a run.
///
/// A profile named `default` always exists: the stored one if the store had it, otherwise
/// the built-in. Reloading takes `&mut self`, so it cannot overlap a run.
#[derive(Debug, Clone)]
pub struct Engine {
    profiles: Vec<ProfileMatcher>,
    skipped: Vec<SkippedProfile>,
    synthesized_default: bool,
}

impl Engine {
    /// Load from a store. Never fails: a broken store degrades to the built-in default.
    pub fn new(store: &dyn ProfileStore) -> Self {
        let batch = match store.load_all() {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "profile store unavailable; using built-in default");
                ProfileBatch::default()
            }
        };
        Self::from_batch(batch)
    }

    pub fn from_profiles(profiles: Vec<Profile>) -> Self {
        Self::from_batch(ProfileBatch {
            profiles,
            skipped: Vec::new(),
        })
    }

    fn from_batch(batch: ProfileBatch) -> Self {
        let mut skipped = batch.skipped;
        let mut names = BTreeSet::new();
        let mut profiles = Vec::new();
        for p in batch.profiles {
            if let Err(e) = p.validate() {
                tracing::warn!(profile = %p.name, error = %e, "skipping invalid profile");
                skipped.push(SkippedProfile {
                    origin: p.name.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
            if !names.insert(p.name.clone()) {
                tracing::warn!(profile = %p.name, "duplicate profile name; keeping the first");
                skipped.push(SkippedProfile {
                    origin: p.name.clone(),
                    reason: "duplicate profile name".to_string(),
                });
                continue;
            }
            profiles.push(ProfileMatcher::new(p));
        }

        let synthesized_default = !names.contains(DEFAULT_PROFILE_NAME);
        if synthesized_default {
            profiles.push(ProfileMatcher::new(Profile::builtin_default()));
        }
        Self {
            profiles,
            skipped,
            synthesized_default,
        }
    }

    /// Replace every profile with a fresh load from `store`.
    pub fn reload(&mut self, store: &dyn ProfileStore) {
        *self = Self::new(store);
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name()).collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter().map(|p| p.profile())
    }

    pub fn skipped(&self) -> &[SkippedProfile] {
        &self.skipped
    }

    /// True when no stored profile was named `default` and the built-in stands in.
    pub fn default_is_synthesized(&self) -> bool {
        self.synthesized_default
    }

    pub fn get(&self, name: &str) -> Option<&ProfileMatcher> {
        self.profiles.iter().find(|p| p.name() == name)
    }

    /// The requested profile, or `default` when none is requested or the name is unknown.
    pub fn profile(&self, name: Option<&str>) -> &ProfileMatcher {
        if let Some(n) = name {
            if let Some(p) = self.get(n) {
                return p;
            }
            tracing::warn!(requested = n, "unknown profile; falling back to default");
        }
        match self.get(DEFAULT_PROFILE_NAME) {
            Some(p) => p,
            // from_batch always inserts a default
            None => &self.profiles[self.profiles.len() - 1],
        }
    }

    pub fn run(&self, candidates: &[Candidate], profile: Option<&str>, max_results: usize) -> RunResult {
        self.profile(profile).run(candidates, max_results)
    }

    pub fn run_merged(
        &self,
        batches: Vec<SourceBatch>,
        profile: Option<&str>,
        max_results: usize,
    ) -> RunResult {
        self.profile(profile).run_merged(batches, max_results)
    }

    /// Score a bare text (no signal, no source).
    pub fn analyze(&self, text: &str, profile: Option<&str>) -> ScoredCandidate {
        self.profile(profile).score(&Candidate::new(text))
    }
}
