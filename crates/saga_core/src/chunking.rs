//! crates/saga_core/src/chunking.rs
//!
//! Splits page content into numbered fragments that each fit under the table
//! store's per-property size ceiling, and joins them back together.

use serde_json::{Map, Value};

/// Maximum number of characters stored in a single content fragment.
pub const CHUNK_SIZE: usize = 60_000;

/// Property-name prefix of every content fragment (`content_1`, `content_2`, ...).
pub const CONTENT_PREFIX: &str = "content_";

pub fn chunk_key(index: usize) -> String {
    format!("{}{}", CONTENT_PREFIX, index)
}

/// Splits `content` into `(key, fragment)` pairs, numbered from 1 without gaps.
///
/// Content at or under [`CHUNK_SIZE`] characters (including the empty string)
/// always yields exactly one fragment. Cuts fall on character boundaries only.
pub fn chunk_content(content: &str) -> Vec<(String, String)> {
    if content.chars().count() <= CHUNK_SIZE {
        return vec![(chunk_key(1), content.to_string())];
    }

    let mut chunks = Vec::new();
    let mut rest = content;
    let mut index = 1;
    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(CHUNK_SIZE)
            .map(|(offset, _)| offset)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(cut);
        chunks.push((chunk_key(index), head.to_string()));
        rest = tail;
        index += 1;
    }
    chunks
}

/// Writes the fragments of `content` into a property bag.
pub fn insert_chunks(properties: &mut Map<String, Value>, content: &str) {
    for (key, fragment) in chunk_content(content) {
        properties.insert(key, Value::String(fragment));
    }
}

/// Concatenates `content_1`, `content_2`, ... until the first missing key.
pub fn reassemble_content(properties: &Map<String, Value>) -> String {
    let mut content = String::new();
    let mut index = 1;
    while let Some(fragment) = properties.get(&chunk_key(index)).and_then(Value::as_str) {
        content.push_str(fragment);
        index += 1;
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(content: &str) -> String {
        let mut properties = Map::new();
        insert_chunks(&mut properties, content);
        reassemble_content(&properties)
    }

    #[test]
    fn short_content_is_a_single_fragment() {
        let chunks = chunk_content("Once upon a time");
        assert_eq!(chunks, vec![("content_1".to_string(), "Once upon a time".to_string())]);
    }

    #[test]
    fn empty_content_round_trips_as_one_empty_fragment() {
        assert_eq!(chunk_content(""), vec![("content_1".to_string(), String::new())]);
        assert_eq!(round_trip(""), "");
    }

    #[test]
    fn fragment_count_is_ceiling_of_length_over_threshold() {
        assert_eq!(chunk_content(&"a".repeat(CHUNK_SIZE)).len(), 1);
        assert_eq!(chunk_content(&"a".repeat(CHUNK_SIZE + 1)).len(), 2);
        assert_eq!(chunk_content(&"a".repeat(CHUNK_SIZE * 3)).len(), 3);
    }

    #[test]
    fn long_multibyte_content_round_trips_exactly() {
        let content = "Æsir ⚔ drakar 🐉 ".repeat(9_000);
        assert!(content.chars().count() > CHUNK_SIZE * 2);

        let chunks = chunk_content(&content);
        let keys: Vec<&str> = chunks.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["content_1", "content_2", "content_3"]);
        assert!(chunks.iter().all(|(_, f)| f.chars().count() <= CHUNK_SIZE));
        assert_eq!(round_trip(&content), content);
    }

    #[test]
    fn reassembly_stops_at_first_gap() {
        let mut properties = Map::new();
        properties.insert("content_1".into(), Value::String("one ".into()));
        properties.insert("content_2".into(), Value::String("two".into()));
        properties.insert("content_4".into(), Value::String(" four".into()));
        assert_eq!(reassemble_content(&properties), "one two");
    }
}
