//! Public facade crate for `nichepipe`.
//!
//! This crate intentionally contains no IO or scoring logic.
//! It re-exports the backend-agnostic types/traits from `nichepipe-core`.

pub use nichepipe_core::*;
