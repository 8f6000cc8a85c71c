use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nichepipe_core::{CandidateSource, Profile, ProfileStore, Tier};
use nichepipe_local::{
    gather, parse_candidates, search_related, DirProfileStore, Engine, JsonFileSource,
    ProfileMatcher, StaticSource,
};
use std::path::PathBuf;
use std::time::Duration;

mod render;

#[derive(Parser, Debug)]
#[command(name = "nichepipe")]
#[command(about = "Rank candidate topics against account profiles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge, dedup, score and rank candidates (json files, or a built-in library).
    Rank(RankCmd),
    /// Score one text and show the breakdown.
    Analyze(AnalyzeCmd),
    /// List candidates whose text contains a query.
    Search(SearchCmd),
    /// List loaded profiles and any that failed to load.
    Profiles(ProfilesCmd),
    /// Write the built-in profiles into the profile directory.
    InitProfiles(InitProfilesCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct StoreArgs {
    /// Directory holding one `<name>.json` per profile (default: ~/.agent/account-profiles).
    #[arg(long, env = "NICHEPIPE_PROFILE_DIR")]
    profile_dir: Option<PathBuf>,
}

impl StoreArgs {
    fn store(&self) -> DirProfileStore {
        DirProfileStore::new(
            self.profile_dir
                .clone()
                .unwrap_or_else(default_profile_dir),
        )
    }
}

fn default_profile_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".agent")
        .join("account-profiles")
}

#[derive(clap::Args, Debug)]
struct RankCmd {
    #[command(flatten)]
    store: StoreArgs,
    /// Profile name; unknown names fall back to `default`.
    #[arg(long, env = "NICHEPIPE_PROFILE")]
    profile: Option<String>,
    /// Candidate JSON file (repeatable). Earlier files win on duplicate texts.
    #[arg(long = "input", short = 'i')]
    inputs: Vec<PathBuf>,
    /// Without inputs, rank the e-commerce hotspot library (limited to this category).
    #[arg(long, conflicts_with = "inputs")]
    category: Option<String>,
    #[arg(long = "max", env = "NICHEPIPE_MAX_RESULTS", default_value_t = 5)]
    max_results: usize,
    /// Per-source fetch timeout.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct AnalyzeCmd {
    #[command(flatten)]
    store: StoreArgs,
    #[arg(long, env = "NICHEPIPE_PROFILE")]
    profile: Option<String>,
    #[arg(long)]
    text: String,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct SearchCmd {
    #[arg(long)]
    query: String,
    /// Candidate JSON file (repeatable). Without inputs the e-commerce hotspot library is searched.
    #[arg(long = "input", short = 'i')]
    inputs: Vec<PathBuf>,
    /// Limit the built-in library to one category.
    #[arg(long, conflicts_with = "inputs")]
    category: Option<String>,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct ProfilesCmd {
    #[command(flatten)]
    store: StoreArgs,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct InitProfilesCmd {
    #[command(flatten)]
    store: StoreArgs,
    /// Overwrite profiles that already exist.
    #[arg(long)]
    force: bool,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn is_text(output: &str) -> bool {
    output.trim().eq_ignore_ascii_case("text")
}

/// `KEY=VALUE` lines; blanks, `#` comments and lines without a key are ignored. An
/// optional `export ` prefix and one layer of matching quotes around the value are dropped.
fn env_file_pairs(txt: &str) -> Vec<(String, String)> {
    txt.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.starts_with('#'))
        .filter_map(|s| s.split_once('='))
        .filter_map(|(k, v)| {
            let k = k.trim();
            let k = k.strip_prefix("export ").map_or(k, str::trim_start);
            if k.is_empty() {
                return None;
            }
            let v = v.trim();
            let v = ['"', '\'']
                .iter()
                .find_map(|q| v.strip_prefix(*q).and_then(|r| r.strip_suffix(*q)))
                .unwrap_or(v);
            Some((k.to_string(), v.to_string()))
        })
        .collect()
}

/// Loads the file named by `NICHEPIPE_ENV_FILE`, e.g. to pin `NICHEPIPE_PROFILE_DIR` for a
/// scheduled job. Variables already set in the process win; values are never logged.
fn load_env_file() {
    let Some(path) = std::env::var_os("NICHEPIPE_ENV_FILE").filter(|p| !p.is_empty()) else {
        return;
    };
    let Ok(txt) = std::fs::read_to_string(&path) else {
        return;
    };
    for (k, v) in env_file_pairs(&txt) {
        if std::env::var_os(&k).is_none() {
            std::env::set_var(k, v);
        }
    }
}

/// Filter from `RUST_LOG`, then `NICHEPIPE_LOG`, else `warn`. Logs go to stderr so stdout
/// stays parseable.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("NICHEPIPE_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Built-in candidates for a run without inputs: the e-commerce library for pain-point
/// profiles or when a category is asked for, else the platform sample.
fn builtin_source(matcher: &ProfileMatcher, category: Option<&str>) -> StaticSource {
    if category.is_some() || !matcher.profile().pain_points.is_empty() {
        StaticSource::ecommerce_hotspots(category)
    } else {
        StaticSource::sample_hotspots()
    }
}

fn resolve<'a>(
    engine: &'a Engine,
    name: Option<&str>,
    warnings: &mut Vec<String>,
) -> &'a ProfileMatcher {
    if let Some(n) = name {
        if engine.get(n).is_none() {
            warnings.push(format!("unknown profile {n:?}; using default"));
        }
    }
    for s in engine.skipped() {
        warnings.push(format!("skipped profile {}: {}", s.origin, s.reason));
    }
    engine.profile(name)
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Rank(args) => {
            let engine = Engine::new(&args.store.store());
            let mut warnings = Vec::new();
            let matcher = resolve(&engine, args.profile.as_deref(), &mut warnings);
            let sources: Vec<Box<dyn CandidateSource>> = if args.inputs.is_empty() {
                vec![Box::new(builtin_source(matcher, args.category.as_deref()))]
            } else {
                args.inputs
                    .iter()
                    .map(|p| Box::new(JsonFileSource::new(p)) as Box<dyn CandidateSource>)
                    .collect()
            };
            let gathered = gather(&sources, args.timeout_ms.map(Duration::from_millis)).await;
            warnings.extend(gathered.warnings);
            let result = matcher.run_merged(gathered.batches, args.max_results);
            let max = matcher.profile().scoring.scale.max();
            if is_text(&args.output) {
                print!("{}", render::rank_text(&result, max, &warnings));
            } else {
                let v = render::envelope("rank", serde_json::to_value(&result)?, &warnings);
                println!("{v}");
            }
        }
        Commands::Analyze(args) => {
            let engine = Engine::new(&args.store.store());
            let mut warnings = Vec::new();
            let matcher = resolve(&engine, args.profile.as_deref(), &mut warnings);
            let sc = matcher.score(&nichepipe_core::Candidate::new(args.text));
            let max = matcher.profile().scoring.scale.max();
            if is_text(&args.output) {
                print!("{}", render::analyze_text(matcher.name(), &sc, max));
            } else {
                let v = render::envelope(
                    "analyze",
                    serde_json::json!({
                        "profile_name": matcher.name(),
                        "scale_max": max,
                        "threshold": matcher.profile().scoring.threshold,
                        "result": sc,
                    }),
                    &warnings,
                );
                println!("{v}");
            }
        }
        Commands::Search(args) => {
            let mut candidates = if args.inputs.is_empty() {
                StaticSource::ecommerce_hotspots(args.category.as_deref())
                    .candidates()
                    .to_vec()
            } else {
                Vec::new()
            };
            for p in &args.inputs {
                let raw = std::fs::read(p).with_context(|| format!("read {}", p.display()))?;
                let mut v =
                    parse_candidates(&raw).with_context(|| format!("parse {}", p.display()))?;
                candidates.append(&mut v);
            }
            let hits = search_related(&args.query, &candidates);
            if is_text(&args.output) {
                for c in &hits {
                    println!("{}", c.text);
                }
            } else {
                let v = render::envelope(
                    "search",
                    serde_json::json!({
                        "query": args.query,
                        "total_input": candidates.len(),
                        "count": hits.len(),
                        "results": hits,
                    }),
                    &[],
                );
                println!("{v}");
            }
        }
        Commands::Profiles(args) => {
            let store = args.store.store();
            let engine = Engine::new(&store);
            let rows: Vec<serde_json::Value> = engine
                .profiles()
                .map(|p| {
                    serde_json::json!({
                        "name": p.name,
                        "description": p.description,
                        "scale": p.scoring.scale,
                        "threshold": p.scoring.threshold,
                        "primary_tier": p.scoring.primary_tier,
                        "keywords": Tier::ALL.iter().map(|t| p.keyword_count(*t)).sum::<usize>(),
                        "pain_points": p.pain_points.len(),
                    })
                })
                .collect();
            if is_text(&args.output) {
                println!("profile dir: {}", store.root().display());
                for p in engine.profiles() {
                    let builtin = if p.name == nichepipe_core::DEFAULT_PROFILE_NAME
                        && engine.default_is_synthesized()
                    {
                        " (built-in)"
                    } else {
                        ""
                    };
                    println!("  {}{builtin}  {}", p.name, p.description);
                }
                for s in engine.skipped() {
                    println!("  skipped {}: {}", s.origin, s.reason);
                }
            } else {
                let v = render::envelope(
                    "profiles",
                    serde_json::json!({
                        "profile_dir": store.root().display().to_string(),
                        "default_synthesized": engine.default_is_synthesized(),
                        "profiles": rows,
                        "skipped": engine.skipped(),
                    }),
                    &[],
                );
                println!("{v}");
            }
        }
        Commands::InitProfiles(args) => {
            let store = args.store.store();
            let mut written = Vec::new();
            let mut kept = Vec::new();
            for p in Profile::builtins() {
                if store.path_for(&p.name).exists() && !args.force {
                    kept.push(p.name);
                    continue;
                }
                store
                    .save(&p)
                    .with_context(|| format!("write profile {}", p.name))?;
                tracing::info!(profile = %p.name, "wrote profile");
                written.push(p.name);
            }
            if is_text(&args.output) {
                println!("profile dir: {}", store.root().display());
                for n in &written {
                    println!("  wrote {n}");
                }
                for n in &kept {
                    println!("  kept {n} (exists; use --force to overwrite)");
                }
            } else {
                let v = render::envelope(
                    "init_profiles",
                    serde_json::json!({
                        "profile_dir": store.root().display().to_string(),
                        "written": written,
                        "kept": kept,
                    }),
                    &[],
                );
                println!("{v}");
            }
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": render::SCHEMA_VERSION,
                "kind": "version",
                "ok": true,
                "name": "nichepipe",
                "version": env!("CARGO_PKG_VERSION"),
            });
            if is_text(&args.output) {
                println!("nichepipe {}", env!("CARGO_PKG_VERSION"));
            } else {
                println!("{v}");
            }
        }
    }
    Ok(())
}
