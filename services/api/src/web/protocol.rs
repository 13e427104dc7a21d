//! services/api/src/web/protocol.rs
//!
//! Defines the JSON request and response payloads exchanged between the
//! single-page frontend and the API server. Field names are camelCase on the wire.

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use saga_core::keys::{is_key_segment, KEY_SEPARATOR};
use saga_core::{Book, Character, Location, Page, PageBeat, RollingSummary, WorldRule};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Rejects a blank value for a field the client must fill in.
pub fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Rejects an id that cannot be one segment of a row key.
pub fn require_key_segment(field: &str, value: &str) -> Result<(), ApiError> {
    if !is_key_segment(value) {
        return Err(ApiError::BadRequest(format!(
            "{} must be non-empty and must not contain '{}'",
            field, KEY_SEPARATOR
        )));
    }
    Ok(())
}

//=========================================================================================
// Books
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub book_id: String,
    pub title: String,
    pub global_genre: String,
    pub global_mood: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            book_id: book.id,
            title: book.title,
            global_genre: book.genre,
            global_mood: book.mood,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub global_genre: String,
    pub global_mood: String,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub global_genre: Option<String>,
    pub global_mood: Option<String>,
}

//=========================================================================================
// World-building entities
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CharacterResponse {
    pub char_id: String,
    pub book_id: String,
    pub name: String,
    pub description: String,
    pub traits: String,
    pub motivation: String,
    pub is_active: bool,
}

impl From<Character> for CharacterResponse {
    fn from(character: Character) -> Self {
        Self {
            char_id: character.id,
            book_id: character.book_id,
            name: character.name,
            description: character.description,
            traits: character.traits,
            motivation: character.motivation,
            is_active: character.is_active,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCharacterRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub traits: String,
    #[serde(default)]
    pub motivation: String,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCharacterRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub traits: Option<String>,
    pub motivation: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub loc_id: String,
    pub book_id: String,
    pub name: String,
    pub description: String,
    pub atmosphere: String,
}

impl From<Location> for LocationResponse {
    fn from(location: Location) -> Self {
        Self {
            loc_id: location.id,
            book_id: location.book_id,
            name: location.name,
            description: location.description,
            atmosphere: location.atmosphere,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub atmosphere: String,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub atmosphere: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorldRuleResponse {
    pub rule_id: String,
    pub book_id: String,
    pub title: String,
    pub description: String,
}

impl From<WorldRule> for WorldRuleResponse {
    fn from(rule: WorldRule) -> Self {
        Self {
            rule_id: rule.id,
            book_id: rule.book_id,
            title: rule.title,
            description: rule.description,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorldRuleRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorldRuleRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

//=========================================================================================
// Pages and summary
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub book_id: String,
    pub page_nr: u32,
    pub content: String,
    pub user_note: String,
    pub target_mood: String,
    pub order_index: u32,
}

impl From<Page> for PageResponse {
    fn from(page: Page) -> Self {
        Self {
            book_id: page.book_id,
            page_nr: page.page_nr,
            content: page.content,
            user_note: page.user_note,
            target_mood: page.target_mood,
            order_index: page.order_index,
        }
    }
}

/// The body of both `pages/generate` and `pages/{nr}/edit`.
#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BeatRequest {
    /// What should happen next (or how to revise); may contain `#mentions`.
    pub user_note: String,
    #[serde(default)]
    pub target_mood: String,
    /// Ids of characters or locations picked explicitly in the client.
    #[serde(default)]
    pub mentioned_entities: Vec<String>,
}

impl From<BeatRequest> for PageBeat {
    fn from(request: BeatRequest) -> Self {
        Self {
            user_note: request.user_note,
            target_mood: request.target_mood,
            mentioned_entities: request.mentioned_entities,
        }
    }
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePageRequest {
    pub content: Option<String>,
    pub user_note: Option<String>,
    pub target_mood: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub book_id: String,
    pub rolling_summary: String,
    pub last_page_index: u32,
}

impl SummaryResponse {
    /// The response for a book that has no summary yet.
    pub fn empty(book_id: String) -> Self {
        Self {
            book_id,
            rolling_summary: String::new(),
            last_page_index: 0,
        }
    }
}

impl From<RollingSummary> for SummaryResponse {
    fn from(summary: RollingSummary) -> Self {
        Self {
            book_id: summary.book_id,
            rolling_summary: summary.rolling_summary,
            last_page_index: summary.last_page_index,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    /// Background summary updates that failed since startup.
    pub summary_failures: u64,
}
