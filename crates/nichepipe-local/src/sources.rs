//! Candidate sources and concurrent gathering.
//!
//! The engine only consumes materialized [`SourceBatch`]es. How the text was obtained
//! (a feed dump, a scrape, a fixture) stays behind [`CandidateSource`].

use async_trait::async_trait;
use futures_util::future::join_all;
use nichepipe_core::{Candidate, CandidateSource, Error, Result, SourceBatch};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Reads candidates from a JSON file.
///
/// Accepts a bare array or an object wrapping it under `data`/`results`/`items`
/// (the shape most scrapers dump).
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    label: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CandidateFile {
    List(Vec<Candidate>),
    Wrapped {
        #[serde(alias = "results", alias = "items")]
        data: Vec<Candidate>,
    },
}

impl JsonFileSource {
    /// The label defaults to the file stem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Self { path, label }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Parse a candidate file body. Exposed so stdin input shares the same shapes.
pub fn parse_candidates(raw: &[u8]) -> Result<Vec<Candidate>> {
    Ok(match serde_json::from_slice::<CandidateFile>(raw) {
        Ok(CandidateFile::List(v)) | Ok(CandidateFile::Wrapped { data: v }) => v,
        Err(_) => {
            // untagged errors are uninformative; re-run as a list for a real message
            serde_json::from_slice::<Vec<Candidate>>(raw)?
        }
    })
}

#[async_trait]
impl CandidateSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch(&self) -> Result<Vec<Candidate>> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::Source(format!("{}: {e}", self.path.display())))?;
        let mut out = parse_candidates(&raw)?;
        for c in &mut out {
            if c.source.is_none() {
                c.source = Some(self.label.clone());
            }
        }
        Ok(out)
    }
}

/// Built-in e-commerce boss-pain headlines, grouped by category. Used when a run has no
/// input of its own.
pub const ECOMMERCE_HOTSPOTS: &[(&str, &[&str])] = &[
    (
        "即时热点",
        &[
            "跨境电商关税调整",
            "亚马逊封店潮",
            "TikTok Shop新政策",
            "物流费用涨价",
            "AI客服替代人工",
            "拼多多仅退款升级",
            "电商税务稽查",
            "直播带货流量下滑",
            "独立站收款被冻结",
            "1688涨价",
        ],
    ),
    (
        "老板痛点类",
        &[
            "订单多但不赚钱",
            "推广费越来越贵",
            "员工工资太高",
            "账期太长资金链紧",
            "平台抽成太高",
            "不知道还能干多久",
        ],
    ),
    (
        "AI相关",
        &[
            "AI选品靠谱吗",
            "AI文案生成器",
            "AI客服能省多少",
            "跨境电商AI工具",
            "会用AI的员工涨薪",
        ],
    ),
    (
        "趋势类",
        &[
            "2026电商还能做吗",
            "消费降级选品策略",
            "私域流量怎么做",
            "小众品类蓝海市场",
            "工厂转型跨境电商",
        ],
    ),
];

/// A fixed in-memory batch.
#[derive(Debug, Clone)]
pub struct StaticSource {
    label: String,
    candidates: Vec<Candidate>,
}

impl StaticSource {
    pub fn new(label: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            label: label.into(),
            candidates,
        }
    }

    /// Three platform hotspots, the offline demo set.
    pub fn sample_hotspots() -> Self {
        Self::new(
            "sample",
            vec![
                Candidate::new("职场新人必备技能")
                    .with_signal(500_000.0)
                    .with_source("douyin"),
                Candidate::new("明星恋情曝光")
                    .with_signal(800_000.0)
                    .with_source("weibo"),
                Candidate::new("副业赚钱方法")
                    .with_signal(300_000.0)
                    .with_source("douyin"),
            ],
        )
    }

    /// [`ECOMMERCE_HOTSPOTS`], optionally limited to one category. Each candidate's source is
    /// its category; none carry a signal. An unknown category yields an empty batch.
    pub fn ecommerce_hotspots(category: Option<&str>) -> Self {
        let candidates = ECOMMERCE_HOTSPOTS
            .iter()
            .filter(|(cat, _)| category.map_or(true, |want| want.trim() == *cat))
            .flat_map(|&(cat, topics)| {
                topics
                    .iter()
                    .map(move |t| Candidate::new(*t).with_source(cat))
            })
            .collect();
        Self::new(category.map_or("ecommerce", str::trim), candidates)
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }
}

#[async_trait]
impl CandidateSource for StaticSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch(&self) -> Result<Vec<Candidate>> {
        Ok(self.candidates.clone())
    }
}

/// Everything fetched, in source order, plus one warning per failed source.
#[derive(Debug, Clone, Default)]
pub struct Gathered {
    pub batches: Vec<SourceBatch>,
    pub warnings: Vec<String>,
}

/// Fetch every source concurrently.
///
/// A failed or timed-out source yields an empty batch (keeping its slot, so precedence
/// stays the caller's order) and a warning; it never fails the gather.
pub async fn gather(sources: &[Box<dyn CandidateSource>], timeout: Option<Duration>) -> Gathered {
    let futs = sources.iter().map(|s| async move {
        let res = match timeout {
            Some(t) => match tokio::time::timeout(t, s.fetch()).await {
                Ok(r) => r,
                Err(_elapsed) => Err(Error::Source(format!(
                    "timed out after {}ms",
                    t.as_millis()
                ))),
            },
            None => s.fetch().await,
        };
        (s.name().to_string(), res)
    });

    let mut out = Gathered::default();
    for (label, res) in join_all(futs).await {
        let candidates = match res {
            Ok(c) => {
                tracing::debug!(source = %label, n = c.len(), "fetched candidates");
                c
            }
            Err(e) => {
                tracing::warn!(source = %label, error = %e, "candidate source failed");
                out.warnings.push(format!("{label}: {e}"));
                Vec::new()
            }
        };
        out.batches.push(SourceBatch {
            source: label,
            candidates,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl CandidateSource for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        async fn fetch(&self) -> Result<Vec<Candidate>> {
            Err(Error::Source("upstream 503".to_string()))
        }
    }

    struct Slow;

    #[async_trait]
    impl CandidateSource for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        async fn fetch(&self) -> Result<Vec<Candidate>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![Candidate::new("late")])
        }
    }

    #[test]
    fn parses_list_and_wrapped_shapes() {
        let v = parse_candidates(br#"[{"topic":"a","heat":1},{"text":"b"}]"#).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].text, "a");
        let v = parse_candidates(br#"{"data":[{"keyword":"x"}]}"#).unwrap();
        assert_eq!(v[0].text, "x");
        let v = parse_candidates(br#"{"results":[{"title":"y","source":"36kr"}]}"#).unwrap();
        assert_eq!(v[0].source.as_deref(), Some("36kr"));
        assert!(parse_candidates(b"{\"nope\":1}").is_err());
    }

    #[tokio::test]
    async fn json_file_source_reads_and_labels() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("huxiu.json");
        std::fs::write(&p, r#"[{"keyword":"物流费用涨价"}]"#).unwrap();
        let s = JsonFileSource::new(&p);
        assert_eq!(s.name(), "huxiu");
        let c = s.fetch().await.unwrap();
        assert_eq!(c[0].text, "物流费用涨价");
        assert_eq!(c[0].source.as_deref(), Some("huxiu"));

        let missing = JsonFileSource::new(td.path().join("nope.json")).with_label("x");
        assert!(missing.fetch().await.is_err());
    }

    #[tokio::test]
    async fn gather_keeps_order_and_isolates_failures() {
        let sources: Vec<Box<dyn CandidateSource>> = vec![
            Box::new(StaticSource::sample_hotspots()),
            Box::new(Failing),
            Box::new(StaticSource::new("extra", vec![Candidate::new("z")])),
        ];
        let g = gather(&sources, None).await;
        let labels: Vec<_> = g.batches.iter().map(|b| b.source.as_str()).collect();
        assert_eq!(labels, ["sample", "failing", "extra"]);
        assert_eq!(g.batches[0].candidates.len(), 3);
        assert!(g.batches[1].candidates.is_empty());
        assert_eq!(g.warnings.len(), 1);
        assert!(g.warnings[0].contains("upstream 503"));
    }

    #[test]
    fn ecommerce_library_filters_by_category() {
        let all = StaticSource::ecommerce_hotspots(None);
        assert_eq!(all.name(), "ecommerce");
        assert_eq!(all.candidates().len(), 26);
        assert_eq!(all.candidates()[0].text, "跨境电商关税调整");
        assert_eq!(all.candidates()[0].source.as_deref(), Some("即时热点"));
        assert!(all.candidates().iter().all(|c| c.signal.is_none()));

        let ai = StaticSource::ecommerce_hotspots(Some("AI相关"));
        assert_eq!(ai.name(), "AI相关");
        assert_eq!(ai.candidates().len(), 5);
        assert!(ai.candidates().iter().all(|c| c.text.contains("AI")));

        assert!(StaticSource::ecommerce_hotspots(Some("nope")).candidates().is_empty());
    }

    #[test]
    fn ecommerce_library_ranks_under_the_pain_profile() {
        let engine = crate::Engine::from_profiles(vec![nichepipe_core::Profile::ecommerce_pain()]);
        let lib = StaticSource::ecommerce_hotspots(None);
        let r = engine.run(lib.candidates(), Some("ecommerce-pain"), 3);
        assert_eq!(r.total_input, 26);
        assert_eq!(r.returned_count, 3);
        assert_eq!(r.results[0].text(), "AI客服替代人工");
    }

    #[tokio::test]
    async fn slow_source_times_out() {
        let sources: Vec<Box<dyn CandidateSource>> =
            vec![Box::new(Slow), Box::new(StaticSource::new("fast", vec![Candidate::new("a")]))];
        let g = gather(&sources, Some(Duration::from_millis(50))).await;
        assert!(g.batches[0].candidates.is_empty());
        assert_eq!(g.batches[1].candidates.len(), 1);
        assert!(g.warnings[0].contains("timed out"));
    }
}
