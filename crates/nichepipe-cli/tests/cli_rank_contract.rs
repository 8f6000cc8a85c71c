use std::path::Path;
use std::process::Command;

fn nichepipe(profile_dir: &Path) -> Command {
    let bin = assert_cmd::cargo::cargo_bin!("nichepipe");
    let mut cmd = Command::new(bin);
    // Keep the run hermetic: no inherited profile choice, limits or env file.
    cmd.env("NICHEPIPE_PROFILE_DIR", profile_dir)
        .env_remove("NICHEPIPE_PROFILE")
        .env_remove("NICHEPIPE_MAX_RESULTS")
        .env_remove("NICHEPIPE_ENV_FILE")
        .env_remove("RUST_LOG");
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.output().expect("run nichepipe");
    assert!(
        out.status.success(),
        "nichepipe failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("parse stdout json")
}

#[test]
fn rank_sample_hotspots_with_builtin_default() {
    let td = tempfile::tempdir().unwrap();
    let v = json_stdout(nichepipe(&td.path().join("profiles")).args(["rank"]));

    assert_eq!(v["kind"].as_str(), Some("rank"));
    assert_eq!(v["ok"].as_bool(), Some(true));
    assert_eq!(v["profile_name"].as_str(), Some("default"));
    assert_eq!(v["total_input"].as_u64(), Some(3));
    assert_eq!(v["passed_count"].as_u64(), Some(2));
    let results = v["results"].as_array().expect("results array");
    assert_eq!(results[0]["text"].as_str(), Some("职场新人必备技能"));
    assert_eq!(results[0]["score"].as_f64(), Some(0.5));
    assert_eq!(results[0]["source"].as_str(), Some("douyin"));
    assert!(results
        .iter()
        .all(|r| r["text"].as_str() != Some("明星恋情曝光")));
}

#[test]
fn rank_merges_inputs_with_stored_profile() {
    let td = tempfile::tempdir().unwrap();
    let dir = td.path().join("profiles");
    let init = json_stdout(nichepipe(&dir).args(["init-profiles"]));
    assert_eq!(init["written"].as_array().map(|a| a.len()), Some(2));

    let a = td.path().join("huxiu.json");
    let b = td.path().join("36kr.json");
    std::fs::write(&a, r#"[{"keyword":"物流费用涨价"},{"keyword":"明星离婚八卦"}]"#).unwrap();
    std::fs::write(
        &b,
        r#"{"data":[{"title":"物流费用涨价 "},{"title":"跨境电商关税调整"}]}"#,
    )
    .unwrap();

    let v = json_stdout(nichepipe(&dir).args([
        "rank",
        "--profile",
        "ecommerce-pain",
        "--max",
        "10",
        "-i",
        a.to_str().unwrap(),
        "-i",
        b.to_str().unwrap(),
    ]));
    assert_eq!(v["profile_name"].as_str(), Some("ecommerce-pain"));
    assert_eq!(v["total_input"].as_u64(), Some(3));
    assert_eq!(v["duplicates_removed"].as_u64(), Some(1));
    let results = v["results"].as_array().unwrap();
    assert_eq!(results[0]["text"].as_str(), Some("跨境电商关税调整"));
    assert_eq!(results[0]["score"].as_f64(), Some(40.0));
    assert_eq!(results[1]["source"].as_str(), Some("huxiu"));
}

#[test]
fn rank_unknown_profile_and_missing_input_are_warnings() {
    let td = tempfile::tempdir().unwrap();
    let v = json_stdout(nichepipe(&td.path().join("profiles")).args([
        "rank",
        "--profile",
        "nope",
        "-i",
        td.path().join("missing.json").to_str().unwrap(),
    ]));
    assert_eq!(v["profile_name"].as_str(), Some("default"));
    assert_eq!(v["total_input"].as_u64(), Some(0));
    let warnings = v["warnings"].as_array().unwrap();
    assert!(warnings.iter().any(|w| w.as_str().unwrap_or("").contains("nope")));
    assert!(warnings.iter().any(|w| w.as_str().unwrap_or("").contains("missing.json")));
}

#[test]
fn rank_text_output_has_bars() {
    let td = tempfile::tempdir().unwrap();
    let out = nichepipe(&td.path().join("profiles"))
        .args(["rank", "--output", "text", "--max", "1"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(s.starts_with("nichepipe rank"), "{s}");
    assert!(s.contains('█'));
    assert!(s.contains("职场新人必备技能"));
    assert!(!s.contains("副业赚钱方法"));
}

#[test]
fn rank_pain_profile_without_input_uses_ecommerce_library() {
    let td = tempfile::tempdir().unwrap();
    let dir = td.path().join("profiles");
    json_stdout(nichepipe(&dir).args(["init-profiles"]));

    let v = json_stdout(nichepipe(&dir).args(["rank", "--profile", "ecommerce-pain", "--max", "3"]));
    assert_eq!(v["profile_name"].as_str(), Some("ecommerce-pain"));
    assert_eq!(v["total_input"].as_u64(), Some(26));
    assert_eq!(v["returned_count"].as_u64(), Some(3));
    let results = v["results"].as_array().unwrap();
    assert_eq!(results[0]["text"].as_str(), Some("AI客服替代人工"));
    assert_eq!(results[0]["score"].as_f64(), Some(47.0));
    assert_eq!(results[0]["source"].as_str(), Some("即时热点"));

    let v = json_stdout(nichepipe(&dir).args(["rank", "--category", "老板痛点类"]));
    assert_eq!(v["profile_name"].as_str(), Some("default"));
    assert_eq!(v["total_input"].as_u64(), Some(6));
}
