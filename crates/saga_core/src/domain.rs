//! crates/saga_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage or serialization format.

use chrono::{DateTime, Utc};

use crate::keys;

/// A book owned by a single user. `id` never changes after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub genre: String,
    pub mood: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Character {
    pub id: String,
    pub book_id: String,
    pub name: String,
    pub description: String,
    pub traits: String,
    pub motivation: String,
    pub is_active: bool,
}

impl Character {
    pub fn row_key(&self) -> String {
        keys::character_key(&self.book_id, &self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub book_id: String,
    pub name: String,
    pub description: String,
    pub atmosphere: String,
}

impl Location {
    pub fn row_key(&self) -> String {
        keys::location_key(&self.book_id, &self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorldRule {
    pub id: String,
    pub book_id: String,
    pub title: String,
    pub description: String,
}

/// A generated story page. `content` is always the fully reassembled text.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub book_id: String,
    pub page_nr: u32,
    pub user_note: String,
    pub target_mood: String,
    pub order_index: u32,
    pub content: String,
}

/// The single evolving summary of a book's story so far.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingSummary {
    pub book_id: String,
    pub rolling_summary: String,
    pub last_page_index: u32,
}

/// A user's instruction for the next (or a revised) page.
#[derive(Debug, Clone, Default)]
pub struct PageBeat {
    /// Free-form instruction, possibly containing `#mentions`.
    pub user_note: String,
    pub target_mood: String,
    /// Explicit entity ids picked by the client, resolved after hashtags.
    pub mentioned_entities: Vec<String>,
}
