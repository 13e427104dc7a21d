//! crates/saga_core/src/hashtag.rs
//!
//! `#mention` handling for beat instructions, e.g. `"#Erik meets #TheDragon"`.

use regex::Regex;
use std::sync::LazyLock;

/// A `#` immediately followed by one or more word characters.
static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("valid hashtag regex"));

/// Returns every tag (without the `#`) in order of appearance, duplicates kept.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    HASHTAG_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Removes the `#` marker from each tag, leaving the rest of the text untouched.
pub fn strip_hashtags(text: &str) -> String {
    HASHTAG_RE.replace_all(text, "$1").into_owned()
}
