//! crates/saga_core/src/keys.rs
//!
//! Composite partition/row key encoding for the table store.
//!
//! Every row belonging to a user lives in the partition `User_{userId}`. Row keys
//! start with a type tag followed by the scoping ids, joined by `_`, so that all
//! rows of one type under one book can be enumerated with a prefix range scan.

/// Separator between the type tag and the scoping ids of a row key.
pub const KEY_SEPARATOR: char = '_';

/// Width of the zero-padded page number inside a page row key.
pub const PAGE_NR_WIDTH: usize = 5;

/// The type tag that leads every row key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Book,
    Character,
    Location,
    WorldRule,
    Page,
    PageSequence,
    Summary,
}

impl RowKind {
    pub fn tag(self) -> &'static str {
        match self {
            RowKind::Book => "BOOK",
            RowKind::Character => "CHAR",
            RowKind::Location => "LOC",
            RowKind::WorldRule => "RULE",
            RowKind::Page => "PAGE",
            RowKind::PageSequence => "PSEQ",
            RowKind::Summary => "SUM",
        }
    }
}

/// A half-open `[start, end)` interval of row keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKeyRange {
    pub start: String,
    pub end: String,
}

pub fn partition_key(user_id: &str) -> String {
    format!("User_{}", user_id)
}

/// Joins a type tag and its scoping ids into a row key.
pub fn row_key(kind: RowKind, parts: &[&str]) -> String {
    let mut key = kind.tag().to_string();
    for part in parts {
        key.push(KEY_SEPARATOR);
        key.push_str(part);
    }
    key
}

pub fn book_key(book_id: &str) -> String {
    row_key(RowKind::Book, &[book_id])
}

pub fn character_key(book_id: &str, char_id: &str) -> String {
    row_key(RowKind::Character, &[book_id, char_id])
}

pub fn location_key(book_id: &str, loc_id: &str) -> String {
    row_key(RowKind::Location, &[book_id, loc_id])
}

pub fn world_rule_key(book_id: &str, rule_id: &str) -> String {
    row_key(RowKind::WorldRule, &[book_id, rule_id])
}

pub fn page_key(book_id: &str, page_nr: u32) -> String {
    let padded = format!("{:0width$}", page_nr, width = PAGE_NR_WIDTH);
    row_key(RowKind::Page, &[book_id, &padded])
}

/// The row holding the highest page number a book ever handed out.
pub fn page_sequence_key(book_id: &str) -> String {
    row_key(RowKind::PageSequence, &[book_id])
}

pub fn summary_key(book_id: &str) -> String {
    row_key(RowKind::Summary, &[book_id])
}

/// Whether `id` can stand as one scoping segment of a row key. An id holding
/// the separator would read back as a different book and entity.
pub fn is_key_segment(id: &str) -> bool {
    !id.is_empty() && !id.contains(KEY_SEPARATOR)
}

/// The prefix shared by every row of `kind` scoped under `scope` (e.g. all
/// characters of one book). An empty scope enumerates every row of the kind.
pub fn scope_prefix(kind: RowKind, scope: &[&str]) -> String {
    let mut prefix = row_key(kind, scope);
    prefix.push(KEY_SEPARATOR);
    prefix
}

/// Builds the range `[prefix, successor(prefix))` that enumerates every key
/// starting with `prefix`.
///
/// The exclusive upper bound is the prefix with its last character replaced by
/// the next code point, which holds for any store ordering keys by code point
/// (or byte, for UTF-8) without relying on a sentinel character.
pub fn prefix_range(prefix: &str) -> RowKeyRange {
    let mut end: Vec<char> = prefix.chars().collect();
    while let Some(last) = end.pop() {
        if let Some(next) = next_char(last) {
            end.push(next);
            return RowKeyRange {
                start: prefix.to_string(),
                end: end.into_iter().collect(),
            };
        }
    }
    // Only reachable for an empty prefix or one made of `char::MAX`.
    RowKeyRange {
        start: prefix.to_string(),
        end: char::MAX.to_string().repeat(prefix.chars().count() + 1),
    }
}

fn next_char(c: char) -> Option<char> {
    let mut code = c as u32 + 1;
    while code <= char::MAX as u32 {
        if let Some(next) = char::from_u32(code) {
            return Some(next);
        }
        // Skip the surrogate block.
        code += 1;
    }
    None
}

/// Splits a row key into its type tag and scoping segments.
pub fn split_row_key(row_key: &str) -> (&str, Vec<&str>) {
    let mut segments = row_key.split(KEY_SEPARATOR);
    let tag = segments.next().unwrap_or_default();
    (tag, segments.collect())
}

/// The last `_`-separated segment of a row key: the entity's own id.
pub fn trailing_id(row_key: &str) -> &str {
    row_key.rsplit(KEY_SEPARATOR).next().unwrap_or(row_key)
}

pub fn page_nr_from_row_key(row_key: &str) -> Option<u32> {
    trailing_id(row_key).parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_range(range: &RowKeyRange, row_key: &str) -> bool {
        row_key >= range.start.as_str() && row_key < range.end.as_str()
    }

    #[test]
    fn builds_row_keys_with_type_tags() {
        assert_eq!(partition_key("u-1"), "User_u-1");
        assert_eq!(book_key("b1"), "BOOK_b1");
        assert_eq!(character_key("b1", "c9"), "CHAR_b1_c9");
        assert_eq!(location_key("b1", "l2"), "LOC_b1_l2");
        assert_eq!(world_rule_key("b1", "r3"), "RULE_b1_r3");
        assert_eq!(summary_key("b1"), "SUM_b1");
        assert_eq!(page_sequence_key("b1"), "PSEQ_b1");
    }

    #[test]
    fn key_segments_reject_the_separator() {
        assert!(is_key_segment("3f2a-9c"));
        assert!(!is_key_segment("b1_x"));
        assert!(!is_key_segment(""));
    }

    #[test]
    fn page_keys_are_zero_padded_and_sort_numerically() {
        assert_eq!(page_key("b1", 7), "PAGE_b1_00007");
        assert!(page_key("b1", 9) < page_key("b1", 10));
        assert_eq!(page_nr_from_row_key("PAGE_b1_00042"), Some(42));
    }

    #[test]
    fn prefix_range_bumps_the_last_character() {
        let range = prefix_range(&scope_prefix(RowKind::Character, &["b1"]));
        assert_eq!(range.start, "CHAR_b1_");
        assert_eq!(range.end, "CHAR_b1`");
        assert!(in_range(&range, "CHAR_b1_c9"));
        assert!(in_range(&range, "CHAR_b1_~~~"));
        assert!(!in_range(&range, "CHAR_b10_c9"));
        assert!(!in_range(&range, "LOC_b1_c9"));
    }

    #[test]
    fn book_prefix_range_excludes_other_kinds() {
        let range = prefix_range(&scope_prefix(RowKind::Book, &[]));
        assert_eq!(range.start, "BOOK_");
        assert!(in_range(&range, "BOOK_123"));
        assert!(!in_range(&range, "CHAR_123_1"));
    }

    #[test]
    fn trailing_id_is_last_segment() {
        assert_eq!(trailing_id("CHAR_b1_c9"), "c9");
        assert_eq!(trailing_id("SUM_b1"), "b1");
        let (tag, parts) = split_row_key("LOC_b1_l2");
        assert_eq!(tag, "LOC");
        assert_eq!(parts, vec!["b1", "l2"]);
    }
}
