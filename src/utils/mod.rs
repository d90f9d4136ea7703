//! Utility functions and helpers.

pub mod console;
pub mod fs;
pub mod http;

use std::cmp::Ordering;

/// Case-insensitive substring containment. An empty needle matches everything;
/// whitespace in the needle is matched literally.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Human-oriented text ordering: case-folded first, then the raw text so the
/// order stays total and deterministic.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
