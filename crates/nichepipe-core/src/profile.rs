//! Account profiles: weighted keyword taxonomies plus the scoring knobs around them.
//!
//! The JSON shape is a superset of the legacy account-profile record
//! (`name`/`description`/`target_audience`/`content_rules`/`script_preference`/`keywords`),
//! so older files deserialize unchanged. Everything the scorer tunes lives under `scoring`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PROFILE_NAME: &str = "default";
pub const DEFAULT_SCRIPT_TYPE: &str = "演绎向";

/// Closed set of weighted tiers.
///
/// `core`/`long_tail`/`trigger` are the keyword tiers; `major`/`moderate`/`minor` are the
/// weight classes of pain-point categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Core,
    LongTail,
    #[serde(alias = "triggers")]
    Trigger,
    Major,
    Moderate,
    Minor,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Core,
        Tier::LongTail,
        Tier::Trigger,
        Tier::Major,
        Tier::Moderate,
        Tier::Minor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Core => "core",
            Tier::LongTail => "long_tail",
            Tier::Trigger => "trigger",
            Tier::Major => "major",
            Tier::Moderate => "moderate",
            Tier::Minor => "minor",
        }
    }
}

/// One weight per tier, expressed in the profile's score scale.
///
/// The defaults are empirical and have no derivation behind them; treat them as tuning
/// points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierWeights {
    pub core: f64,
    pub long_tail: f64,
    pub trigger: f64,
    pub major: f64,
    pub moderate: f64,
    pub minor: f64,
}

impl TierWeights {
    pub fn weight(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Core => self.core,
            Tier::LongTail => self.long_tail,
            Tier::Trigger => self.trigger,
            Tier::Major => self.major,
            Tier::Moderate => self.moderate,
            Tier::Minor => self.minor,
        }
    }

    /// The default table on the percent scale.
    pub fn percent() -> Self {
        Self {
            core: 30.0,
            long_tail: 10.0,
            trigger: 15.0,
            major: 25.0,
            moderate: 22.0,
            minor: 15.0,
        }
    }
}

impl Default for TierWeights {
    fn default() -> Self {
        Self {
            core: 0.30,
            long_tail: 0.10,
            trigger: 0.15,
            major: 0.25,
            moderate: 0.22,
            minor: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreScale {
    /// `[0, 1]`
    #[default]
    Unit,
    /// `[0, 100]`
    Percent,
}

impl ScoreScale {
    pub fn max(&self) -> f64 {
        match self {
            ScoreScale::Unit => 1.0,
            ScoreScale::Percent => 100.0,
        }
    }
}

/// How a pain-point category contributes when several of its keywords hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PainCounting {
    /// The category weight counts once, however many keywords hit.
    #[default]
    PerCategory,
    /// Every hit keyword adds the category weight.
    PerKeyword,
}

/// `boost = clamp(signal / divisor, 0, cap)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub divisor: f64,
    pub cap: f64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            divisor: 1_000_000.0,
            cap: 0.2,
        }
    }
}

/// Flat bonus when the text mentions any domain keyword.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BonusParams {
    pub keywords: Vec<String>,
    pub amount: f64,
}

/// Flat penalty when the text mentions any exclusion pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PenaltyParams {
    pub patterns: Vec<String>,
    pub amount: f64,
}

/// Fields left out of a stored `scoring` block take the default for the block's `scale`,
/// so `{"scale": "percent"}` alone yields percent-scale threshold, weights and boost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ScoringRecord")]
pub struct ScoringParams {
    pub scale: ScoreScale,
    pub threshold: f64,
    /// Tier score used when the primary tier has no keywords configured.
    pub neutral_score: f64,
    pub primary_tier: Tier,
    pub weights: TierWeights,
    pub pain_counting: PainCounting,
    pub boost: Option<BoostParams>,
    pub bonus: Option<BonusParams>,
    pub penalty: Option<PenaltyParams>,
    pub max_tags: usize,
    /// Tag reported when no pain category matched.
    pub untagged_label: Option<String>,
}

impl ScoringParams {
    /// Defaults expressed in `scale`. Percent values are spelled out rather than multiplied
    /// so they stay exact (`0.3 * 100.0` is not `30.0`).
    pub fn for_scale(scale: ScoreScale) -> Self {
        let (mid, weights, boost) = match scale {
            ScoreScale::Unit => (0.5, TierWeights::default(), BoostParams::default()),
            ScoreScale::Percent => (
                50.0,
                TierWeights::percent(),
                BoostParams {
                    divisor: 10_000.0,
                    cap: 20.0,
                },
            ),
        };
        Self {
            scale,
            threshold: mid,
            neutral_score: mid,
            primary_tier: Tier::Core,
            weights,
            pain_counting: PainCounting::PerCategory,
            boost: Some(boost),
            bonus: None,
            penalty: None,
            max_tags: 3,
            untagged_label: None,
        }
    }
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self::for_scale(ScoreScale::Unit)
    }
}

/// Present-but-null stays distinguishable from absent: `Some(None)` vs `None`.
fn present<'de, D, T>(d: D) -> std::result::Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(d).map(Some)
}

/// Stored weight table; missing tiers come from the scale's defaults.
#[derive(Deserialize, Default)]
#[serde(default)]
struct WeightsRecord {
    core: Option<f64>,
    long_tail: Option<f64>,
    trigger: Option<f64>,
    major: Option<f64>,
    moderate: Option<f64>,
    minor: Option<f64>,
}

/// Stored `scoring` block, every field optional.
#[derive(Deserialize, Default)]
#[serde(default)]
struct ScoringRecord {
    scale: ScoreScale,
    threshold: Option<f64>,
    neutral_score: Option<f64>,
    primary_tier: Option<Tier>,
    weights: Option<WeightsRecord>,
    pain_counting: Option<PainCounting>,
    #[serde(deserialize_with = "present")]
    boost: Option<Option<BoostParams>>,
    bonus: Option<BonusParams>,
    penalty: Option<PenaltyParams>,
    max_tags: Option<usize>,
    untagged_label: Option<String>,
}

impl From<ScoringRecord> for ScoringParams {
    fn from(r: ScoringRecord) -> Self {
        let d = Self::for_scale(r.scale);
        let w = r.weights.unwrap_or_default();
        Self {
            scale: r.scale,
            threshold: r.threshold.unwrap_or(d.threshold),
            neutral_score: r.neutral_score.unwrap_or(d.neutral_score),
            primary_tier: r.primary_tier.unwrap_or(d.primary_tier),
            weights: TierWeights {
                core: w.core.unwrap_or(d.weights.core),
                long_tail: w.long_tail.unwrap_or(d.weights.long_tail),
                trigger: w.trigger.unwrap_or(d.weights.trigger),
                major: w.major.unwrap_or(d.weights.major),
                moderate: w.moderate.unwrap_or(d.weights.moderate),
                minor: w.minor.unwrap_or(d.weights.minor),
            },
            pain_counting: r.pain_counting.unwrap_or(d.pain_counting),
            boost: r.boost.unwrap_or(d.boost),
            bonus: r.bonus,
            penalty: r.penalty,
            max_tags: r.max_tags.unwrap_or(d.max_tags),
            untagged_label: r.untagged_label,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetAudience {
    pub age_ranges: Vec<String>,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentRules {
    pub forbidden_topics: Vec<String>,
    pub preferred_emotions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptPreference {
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PainCategory {
    pub label: String,
    pub tier: Tier,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_audience: TargetAudience,
    #[serde(default)]
    pub content_rules: ContentRules,
    #[serde(default)]
    pub script_preference: ScriptPreference,
    /// Keyword tiers. An unknown tier name fails deserialization.
    #[serde(default)]
    pub keywords: BTreeMap<Tier, Vec<String>>,
    #[serde(default)]
    pub pain_points: Vec<PainCategory>,
    #[serde(default)]
    pub scoring: ScoringParams,
}

impl Profile {
    /// An empty profile with default scoring.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            target_audience: TargetAudience::default(),
            content_rules: ContentRules::default(),
            script_preference: ScriptPreference::default(),
            keywords: BTreeMap::new(),
            pain_points: Vec::new(),
            scoring: ScoringParams::default(),
        }
    }

    pub fn with_keywords<I, S>(mut self, tier: Tier, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords
            .insert(tier, keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_forbidden<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_rules.forbidden_topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_pain_point<I, S>(mut self, label: &str, tier: Tier, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pain_points.push(PainCategory {
            label: label.to_string(),
            tier,
            keywords: keywords.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Keywords configured for `tier` across both taxonomies (before normalization).
    pub fn keyword_count(&self, tier: Tier) -> usize {
        let kw = self.keywords.get(&tier).map(|v| v.len()).unwrap_or(0);
        let pain: usize = self
            .pain_points
            .iter()
            .filter(|c| c.tier == tier)
            .map(|c| c.keywords.len())
            .sum();
        kw + pain
    }

    /// First preferred script type; the recommendation attached to passing candidates.
    pub fn recommended_script(&self) -> &str {
        self.script_preference
            .types
            .first()
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SCRIPT_TYPE)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidProfile {
            name: self.name.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        let s = &self.scoring;
        let max = s.scale.max();
        for tier in Tier::ALL {
            let w = s.weights.weight(tier);
            if !w.is_finite() || w < 0.0 {
                return Err(invalid(format!(
                    "weight for tier {} must be finite and >= 0 (got {w})",
                    tier.as_str()
                )));
            }
        }
        if !s.threshold.is_finite() || s.threshold < 0.0 || s.threshold > max {
            return Err(invalid(format!(
                "threshold {} outside [0, {max}]",
                s.threshold
            )));
        }
        if !s.neutral_score.is_finite() || s.neutral_score < 0.0 || s.neutral_score > max {
            return Err(invalid(format!(
                "neutral_score {} outside [0, {max}]",
                s.neutral_score
            )));
        }
        if let Some(b) = &s.boost {
            if !b.divisor.is_finite() || b.divisor <= 0.0 {
                return Err(invalid(format!("boost.divisor must be > 0 (got {})", b.divisor)));
            }
            if !b.cap.is_finite() || b.cap < 0.0 {
                return Err(invalid(format!("boost.cap must be >= 0 (got {})", b.cap)));
            }
        }
        if let Some(b) = &s.bonus {
            if !b.amount.is_finite() || b.amount < 0.0 {
                return Err(invalid(format!("bonus.amount must be >= 0 (got {})", b.amount)));
            }
        }
        if let Some(p) = &s.penalty {
            if !p.amount.is_finite() || p.amount < 0.0 {
                return Err(invalid(format!(
                    "penalty.amount must be >= 0 (got {})",
                    p.amount
                )));
            }
        }
        Ok(())
    }

    /// The profile synthesized when no stored profile is available.
    pub fn builtin_default() -> Self {
        let mut p = Self::named(DEFAULT_PROFILE_NAME).with_keywords(Tier::Core, ["职场", "赚钱"]);
        p.description = "Default account profile".to_string();
        p.target_audience = TargetAudience {
            age_ranges: vec!["25-35".to_string()],
            interests: vec!["职场".to_string(), "成长".to_string(), "赚钱".to_string()],
        };
        p.script_preference.types = vec![DEFAULT_SCRIPT_TYPE.to_string()];
        p.keywords.insert(Tier::LongTail, Vec::new());
        p.keywords.insert(Tier::Trigger, Vec::new());
        p
    }

    /// E-commerce owner persona: ranks business headlines by the pain points they touch.
    pub fn ecommerce_pain() -> Self {
        let mut p = Self::named("ecommerce-pain")
            .with_pain_point(
                "利润薄",
                Tier::Major,
                [
                    "赚钱", "盈利", "利润", "亏损", "亏本", "收入", "营收", "生意", "订单", "销售额",
                    "GMV", "客单价",
                ],
            )
            .with_pain_point(
                "流量贵",
                Tier::Major,
                ["流量", "获客", "推广", "广告", "营销", "曝光", "转化", "点击", "询盘", "引流"],
            )
            .with_pain_point(
                "成本高",
                Tier::Major,
                [
                    "成本", "费用", "涨价", "价格", "房租", "人工", "工资", "租金", "物流", "运费",
                    "原材料", "关税",
                ],
            )
            .with_pain_point(
                "转化难",
                Tier::Minor,
                ["转化", "销售", "购买", "下单", "成交", "成交率", "复购", "留存", "活跃"],
            )
            .with_pain_point(
                "平台压榨",
                Tier::Moderate,
                ["平台", "规则", "抽成", "佣金", "封号", "监管", "政策", "合规", "处罚", "限流"],
            )
            .with_pain_point(
                "AI焦虑",
                Tier::Moderate,
                [
                    "AI", "人工智能", "自动化", "智能", "替代", "裁员", "智能体", "大模型", "机器人",
                    "无人",
                ],
            )
            .with_pain_point(
                "资金压力",
                Tier::Moderate,
                [
                    "资金", "融资", "贷款", "账期", "回款", "现金流", "债务", "违约", "破产", "投资",
                    "募资",
                ],
            )
            .with_pain_point(
                "消费降级",
                Tier::Minor,
                ["消费", "经济", "降级", "通缩", "省钱", "低价", "性价比", "折扣", "便宜"],
            );
        p.description = "被利润掐住喉咙的电商老板".to_string();
        p.script_preference.types = vec![DEFAULT_SCRIPT_TYPE.to_string()];
        p.scoring = ScoringParams {
            scale: ScoreScale::Percent,
            threshold: 0.0,
            neutral_score: 50.0,
            primary_tier: Tier::Major,
            weights: TierWeights {
                major: 25.0,
                moderate: 22.0,
                minor: 15.0,
                ..TierWeights::percent()
            },
            pain_counting: PainCounting::PerCategory,
            boost: None,
            bonus: Some(BonusParams {
                keywords: [
                    "电商", "跨境", "零售", "商业", "企业", "老板", "商家", "商户", "卖家", "天猫",
                    "淘宝", "京东", "拼多多", "亚马逊", "TikTok", "Shopee",
                ]
                .into_iter()
                .map(String::from)
                .collect(),
                amount: 15.0,
            }),
            penalty: Some(PenaltyParams {
                patterns: ["娱乐", "明星", "八卦", "绯闻", "恋情", "离婚"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                amount: 30.0,
            }),
            max_tags: 3,
            untagged_label: Some("一般".to_string()),
        };
        p
    }

    pub fn builtins() -> Vec<Profile> {
        vec![Self::builtin_default(), Self::ecommerce_pain()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_profile_record_deserializes() {
        let raw = r#"{
            "name": "career",
            "description": "legacy",
            "target_audience": {"age_ranges": ["25-35"], "interests": ["职场"]},
            "content_rules": {"forbidden_topics": ["明星"], "preferred_emotions": []},
            "script_preference": {"types": ["干货向"]},
            "keywords": {"core": ["职场"], "long_tail": ["面试"], "triggers": ["必备"]}
        }"#;
        let p: Profile = serde_json::from_str(raw).unwrap();
        assert_eq!(p.keywords[&Tier::Trigger], vec!["必备".to_string()]);
        assert_eq!(p.content_rules.forbidden_topics, vec!["明星".to_string()]);
        assert_eq!(p.scoring, ScoringParams::default());
        assert_eq!(p.recommended_script(), "干货向");
        p.validate().unwrap();
    }

    #[test]
    fn unknown_tier_name_is_rejected() {
        let raw = r#"{"name":"x","keywords":{"core":["a"],"hot_takes":["b"]}}"#;
        let err = serde_json::from_str::<Profile>(raw).unwrap_err();
        assert!(err.to_string().contains("hot_takes"), "err={err}");
    }

    #[test]
    fn validate_rejects_bad_numbers() {
        let mut p = Profile::named("x");
        p.scoring.threshold = 1.5;
        assert!(p.validate().is_err());

        let mut p = Profile::named("x");
        p.scoring.boost = Some(BoostParams {
            divisor: 0.0,
            cap: 0.2,
        });
        assert!(p.validate().is_err());

        let mut p = Profile::named("x");
        p.scoring.weights.core = f64::NAN;
        assert!(p.validate().is_err());

        assert!(Profile::named("  ").validate().is_err());
    }

    #[test]
    fn builtins_are_valid_and_round_trip() {
        for p in Profile::builtins() {
            p.validate().unwrap();
            let s = serde_json::to_string(&p).unwrap();
            let back: Profile = serde_json::from_str(&s).unwrap();
            assert_eq!(back, p);
        }
    }

    #[test]
    fn percent_scale_block_takes_percent_defaults() {
        let p: Profile =
            serde_json::from_str(r#"{"name":"p","scoring":{"scale":"percent"}}"#).unwrap();
        assert_eq!(p.scoring, ScoringParams::for_scale(ScoreScale::Percent));
        assert_eq!(p.scoring.threshold, 50.0);
        assert_eq!(p.scoring.neutral_score, 50.0);
        assert_eq!(p.scoring.weights.weight(Tier::Core), 30.0);
        assert_eq!(p.scoring.boost.as_ref().map(|b| b.cap), Some(20.0));
        p.validate().unwrap();

        // explicit values and partial weight tables still win over the scale defaults
        let p: Profile = serde_json::from_str(
            r#"{"name":"p","scoring":{"scale":"percent","threshold":10,
                "weights":{"core":40},"boost":null}}"#,
        )
        .unwrap();
        assert_eq!(p.scoring.threshold, 10.0);
        assert_eq!(p.scoring.neutral_score, 50.0);
        assert_eq!(p.scoring.weights.core, 40.0);
        assert_eq!(p.scoring.weights.long_tail, 10.0);
        assert_eq!(p.scoring.boost, None);
    }

    #[test]
    fn ecommerce_weights_follow_pain_classes() {
        let p = Profile::ecommerce_pain();
        let w = &p.scoring.weights;
        assert_eq!(w.weight(Tier::Major), 25.0);
        assert_eq!(w.weight(Tier::Moderate), 22.0);
        assert_eq!(w.weight(Tier::Minor), 15.0);
        assert_eq!(p.scoring.scale.max(), 100.0);
        assert!(p.keyword_count(Tier::Major) > 0);
    }

    #[test]
    fn default_profile_matches_documented_taxonomy() {
        let p = Profile::builtin_default();
        assert_eq!(p.name, DEFAULT_PROFILE_NAME);
        assert_eq!(p.keyword_count(Tier::Core), 2);
        assert_eq!(p.scoring.boost, Some(BoostParams::default()));
        assert_eq!(p.scoring.threshold, 0.5);
    }
}
