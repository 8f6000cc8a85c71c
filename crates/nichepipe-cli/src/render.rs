use nichepipe_core::{RunResult, ScoredCandidate};
use serde_json::Value;
use std::fmt::Write as _;

pub(crate) const SCHEMA_VERSION: u64 = 1;
const BAR_WIDTH: usize = 20;

/// `{schema_version, kind, ok, warnings, ...body}`. A non-object body lands under `data`.
pub(crate) fn envelope(kind: &str, body: Value, warnings: &[String]) -> Value {
    let mut out = serde_json::json!({
        "schema_version": SCHEMA_VERSION,
        "kind": kind,
        "ok": true,
        "warnings": warnings,
    });
    let Some(dst) = out.as_object_mut() else {
        return out;
    };
    match body {
        Value::Object(src) => dst.extend(src),
        other => {
            dst.insert("data".to_string(), other);
        }
    }
    out
}

pub(crate) fn bar(score: f64, max: f64) -> String {
    let frac = if max > 0.0 {
        (score / max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (frac * BAR_WIDTH as f64).round() as usize;
    let mut s = "█".repeat(filled);
    s.push_str(&"░".repeat(BAR_WIDTH - filled));
    s
}

fn fmt_score(score: f64, max: f64) -> String {
    if max > 1.0 {
        format!("{score:>5.1}")
    } else {
        format!("{score:.3}")
    }
}

fn candidate_line(out: &mut String, idx: usize, sc: &ScoredCandidate, max: f64) {
    let _ = write!(
        out,
        "{idx:>2}. {} {} {}",
        fmt_score(sc.score, max),
        bar(sc.score, max),
        sc.text()
    );
    if let Some(src) = &sc.candidate().source {
        let _ = write!(out, "  ({src})");
    }
    out.push('\n');
    if !sc.tags.is_empty() {
        let _ = writeln!(out, "    tags: {}", sc.tags.join(", "));
    }
}

fn warnings_block(out: &mut String, warnings: &[String]) {
    for w in warnings {
        let _ = writeln!(out, "warning: {w}");
    }
}

pub(crate) fn rank_text(r: &RunResult, max: f64, warnings: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "nichepipe rank  profile={}  input={}  passed={}  returned={}  duplicates={}",
        r.profile_name, r.total_input, r.passed_count, r.returned_count, r.duplicates_removed
    );
    if r.results.is_empty() {
        out.push_str("(no candidates passed)\n");
    }
    for (i, sc) in r.results.iter().enumerate() {
        candidate_line(&mut out, i + 1, sc, max);
    }
    warnings_block(&mut out, warnings);
    out
}

pub(crate) fn analyze_text(profile: &str, sc: &ScoredCandidate, max: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "nichepipe analyze  profile={profile}");
    let _ = writeln!(out, "text:   {}", sc.text());
    let _ = writeln!(
        out,
        "score:  {} {} {}",
        fmt_score(sc.score, max),
        bar(sc.score, max),
        if sc.passed { "PASS" } else { "FAIL" }
    );
    if let Some(v) = &sc.veto {
        let _ = writeln!(out, "veto:   {v}");
    }
    let b = &sc.breakdown;
    let _ = writeln!(
        out,
        "parts:  tier={} boost={} bonus={} penalty={}",
        b.tier_score, b.boost, b.bonus, b.penalty
    );
    for (tier, kws) in &sc.matches.matched {
        let _ = writeln!(out, "  {}: {}", tier.as_str(), kws.join(", "));
    }
    for c in &sc.matches.categories {
        let _ = writeln!(out, "  {} [{}]: {}", c.label, c.tier.as_str(), c.keywords.join(", "));
    }
    let reasons: Vec<&str> = sc.reasons.iter().map(|r| r.as_str()).collect();
    let _ = writeln!(out, "reasons: {}", reasons.join(", "));
    if let Some(rec) = &sc.recommendation {
        let _ = writeln!(out, "script: {rec}");
    }
    out
}
