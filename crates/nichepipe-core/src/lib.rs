use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub mod profile;

pub use profile::{
    BoostParams, ContentRules, PainCategory, PainCounting, PenaltyParams, BonusParams, Profile,
    ScoreScale, ScoringParams, ScriptPreference, TargetAudience, Tier, TierWeights,
    DEFAULT_PROFILE_NAME, DEFAULT_SCRIPT_TYPE,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid profile {name:?}: {reason}")]
    InvalidProfile { name: String, reason: String },
    #[error("profile store error: {0}")]
    ProfileStore(String),
    #[error("candidate source failed: {0}")]
    Source(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn null_as_empty<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

/// One unit of free text handed to the pipeline.
///
/// Accepts the legacy hotspot shapes on input: `topic`/`keyword`/`title` for the text,
/// `heat` for the signal and `platform` for the source label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(
        default,
        alias = "topic",
        alias = "keyword",
        alias = "title",
        deserialize_with = "null_as_empty"
    )]
    pub text: String,
    /// Popularity/heat count or any other numeric signal feeding the boost.
    #[serde(default, alias = "heat", skip_serializing_if = "Option::is_none")]
    pub signal: Option<f64>,
    #[serde(default, alias = "platform", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Candidate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            signal: None,
            source: None,
        }
    }

    pub fn with_signal(mut self, signal: f64) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    Forbidden,
    KeywordMatch,
    NoMatch,
    NeutralDefault,
    Boosted,
    CategoryBonus,
    Penalized,
    BelowThreshold,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Forbidden => "forbidden",
            Reason::KeywordMatch => "keyword-match",
            Reason::NoMatch => "no-match",
            Reason::NeutralDefault => "neutral-default",
            Reason::Boosted => "boosted",
            Reason::CategoryBonus => "category-bonus",
            Reason::Penalized => "penalized",
            Reason::BelowThreshold => "below-threshold",
        }
    }
}

/// A pain-point category that fired, with the keywords that hit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMatch {
    pub label: String,
    pub tier: Tier,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Keyword-tier hits, keyed by tier. Tiers without hits are absent.
    #[serde(default)]
    pub matched: BTreeMap<Tier, Vec<String>>,
    #[serde(default)]
    pub categories: Vec<CategoryMatch>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.matched.values().all(|v| v.is_empty()) && self.categories.is_empty()
    }
}

/// Per-component contributions, in the profile's scale, before the final clamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub tier_score: f64,
    pub boost: f64,
    pub bonus: f64,
    pub penalty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub matches: MatchResult,
    /// Final score, clamped to the profile scale and rounded to 3 decimals.
    pub score: f64,
    pub passed: bool,
    pub reasons: Vec<Reason>,
    #[serde(default)]
    pub breakdown: ScoreBreakdown,
    /// The forbidden keyword that vetoed this candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub veto: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl ScoredCandidate {
    pub fn candidate(&self) -> &Candidate {
        &self.matches.candidate
    }

    pub fn text(&self) -> &str {
        &self.matches.candidate.text
    }

    pub fn has_reason(&self, r: Reason) -> bool {
        self.reasons.contains(&r)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub profile_name: String,
    pub total_input: usize,
    pub passed_count: usize,
    pub returned_count: usize,
    /// Repeats dropped while merging sources (0 for single-batch runs).
    #[serde(default)]
    pub duplicates_removed: usize,
    pub results: Vec<ScoredCandidate>,
}

impl RunResult {
    pub fn empty(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
            total_input: 0,
            passed_count: 0,
            returned_count: 0,
            duplicates_removed: 0,
            results: Vec::new(),
        }
    }
}

/// A stored profile record that could not be loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedProfile {
    /// Where the record came from (file path, store key, ...).
    pub origin: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileBatch {
    pub profiles: Vec<Profile>,
    pub skipped: Vec<SkippedProfile>,
}

/// Loads and persists profiles. A malformed record goes to `skipped`; `Err` is reserved for
/// the store itself being unusable.
pub trait ProfileStore: Send + Sync {
    fn load_all(&self) -> Result<ProfileBatch>;
    fn save(&self, profile: &Profile) -> Result<()>;
}

/// Candidates from one source, in the order the source produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBatch {
    pub source: String,
    pub candidates: Vec<Candidate>,
}

#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Result<Vec<Candidate>>;
}
