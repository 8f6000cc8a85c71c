//! Forbidden-topic short-circuit.

use crate::matcher::{any_hit, ProfileMatcher};

/// The first forbidden topic (in configured order) contained in `text`.
pub fn check<'a>(matcher: &'a ProfileMatcher, text: &str) -> Option<&'a str> {
    any_hit(text, &matcher.forbidden)
}
