//! Local nichepipe pipeline: extraction, matching, scoring, ranking, dedup, plus the
//! filesystem profile store and candidate sources.

pub mod dedup;
pub mod engine;
pub mod extract;
pub mod matcher;
pub mod rank;
pub mod scorer;
pub mod sources;
pub mod store;
pub mod textprep;
pub mod veto;

pub use engine::{run, score, search_related, Engine};
pub use matcher::ProfileMatcher;
pub use sources::{
    gather, parse_candidates, Gathered, JsonFileSource, StaticSource, ECOMMERCE_HOTSPOTS,
};
pub use store::{DirProfileStore, MemoryProfileStore};
