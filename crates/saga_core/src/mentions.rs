//! crates/saga_core/src/mentions.rs
//!
//! Resolves `#mentions` and client-supplied entity ids to canonical character
//! and location names for the "focus entities" line of a prompt.

use crate::domain::{Character, Location};
use crate::hashtag::extract_hashtags;
use crate::keys::trailing_id;

/// Collects the names of the entities referenced by `tagged_text` and
/// `explicit_ids`, deduplicated by exact name with first-match-wins ordering.
///
/// Hashtags are resolved first (in text order), explicit ids second (in the
/// given order). Tokens or ids that match nothing are skipped.
pub fn resolve_mentions(
    tagged_text: &str,
    explicit_ids: &[String],
    characters: &[Character],
    locations: &[Location],
) -> Vec<String> {
    let mut names = MentionList::default();

    for tag in extract_hashtags(tagged_text) {
        let tag = tag.to_lowercase();
        if let Some(character) = characters.iter().find(|c| c.name.to_lowercase() == tag) {
            names.push(&character.name);
        } else if let Some(location) = locations.iter().find(|l| compact_name(&l.name) == tag) {
            names.push(&location.name);
        }
    }

    for id in explicit_ids {
        if let Some(character) = characters.iter().find(|c| trailing_id(&c.row_key()) == id) {
            names.push(&character.name);
        }
        if let Some(location) = locations.iter().find(|l| trailing_id(&l.row_key()) == id) {
            names.push(&location.name);
        }
    }

    names.0
}

/// Location names are matched with all whitespace removed ("Deep Forest" ~ `#DeepForest`).
fn compact_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

#[derive(Default)]
struct MentionList(Vec<String>);

impl MentionList {
    fn push(&mut self, name: &str) {
        if !self.0.iter().any(|existing| existing == name) {
            self.0.push(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(id: &str, name: &str) -> Character {
        Character {
            id: id.into(),
            book_id: "b1".into(),
            name: name.into(),
            description: String::new(),
            traits: String::new(),
            motivation: String::new(),
            is_active: true,
        }
    }

    fn location(id: &str, name: &str) -> Location {
        Location {
            id: id.into(),
            book_id: "b1".into(),
            name: name.into(),
            description: String::new(),
            atmosphere: String::new(),
        }
    }

    #[test]
    fn tags_resolve_characters_then_locations_in_text_order() {
        let characters = vec![character("c1", "Erik")];
        let locations = vec![location("l1", "Deep Forest")];

        let names = resolve_mentions("#Erik enters #DeepForest", &[], &characters, &locations);
        assert_eq!(names, vec!["Erik", "Deep Forest"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let characters = vec![character("c1", "Erik")];
        let locations = vec![location("l1", "Deep Forest")];

        let names = resolve_mentions("#deepforest then #ERIK", &[], &characters, &locations);
        assert_eq!(names, vec!["Deep Forest", "Erik"]);
    }

    #[test]
    fn character_match_wins_over_location_with_same_name() {
        let characters = vec![character("c1", "Raven")];
        let locations = vec![location("l1", "Raven")];

        let names = resolve_mentions("#Raven", &["l1".to_string()], &characters, &locations);
        assert_eq!(names, vec!["Raven"]);
    }

    #[test]
    fn explicit_ids_do_not_duplicate_tagged_names() {
        let characters = vec![character("c1", "Erik"), character("c2", "Sigrid")];
        let locations = vec![location("l1", "Deep Forest")];

        let ids = vec!["c1".to_string(), "l1".to_string(), "c2".to_string()];
        let names = resolve_mentions("#Erik enters #DeepForest", &ids, &characters, &locations);
        assert_eq!(names, vec!["Erik", "Deep Forest", "Sigrid"]);
    }

    #[test]
    fn unknown_tags_and_ids_are_ignored() {
        let characters = vec![character("c1", "Erik")];
        let ids = vec!["nope".to_string()];

        let names = resolve_mentions("#Nobody waits in #Nowhere", &ids, &characters, &[]);
        assert!(names.is_empty());
    }

    #[test]
    fn repeated_tags_yield_one_name() {
        let characters = vec![character("c1", "Erik")];
        let names = resolve_mentions("#Erik and #erik and #Erik", &[], &characters, &[]);
        assert_eq!(names, vec!["Erik"]);
    }
}
