//! crates/saga_core/src/repository.rs
//!
//! Typed access to the story entities on top of the `TableStore` port.
//!
//! Each entity knows its row key and how to flatten itself into a property bag.
//! Page content is split into `content_N` fragments on write and reassembled on
//! read, so callers only ever see whole page texts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::warn;

use crate::chunking::{insert_chunks, reassemble_content};
use crate::domain::{Book, Character, Location, Page, RollingSummary, WorldRule};
use crate::keys::{self, prefix_range, scope_prefix, split_row_key, RowKind};
use crate::ports::{PortError, PortResult, TableEntity, TableStore, UpdateMode};

/// How many consecutive page numbers are tried before giving up on a new page.
pub const PAGE_CREATE_ATTEMPTS: u32 = 5;

//=========================================================================================
// Row Mapping
//=========================================================================================

trait TableRow: Sized + Send + Sync {
    /// Human-readable entity name used in not-found messages.
    const ENTITY: &'static str;

    fn row_key(&self) -> String;
    fn to_properties(&self) -> Map<String, Value>;
    fn from_entity(entity: TableEntity) -> PortResult<Self>;
}

impl TableRow for Book {
    const ENTITY: &'static str = "Book";

    fn row_key(&self) -> String {
        keys::book_key(&self.id)
    }

    fn to_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("title".into(), self.title.clone().into());
        props.insert("globalGenre".into(), self.genre.clone().into());
        props.insert("globalMood".into(), self.mood.clone().into());
        props.insert("createdAt".into(), self.created_at.to_rfc3339().into());
        props.insert("updatedAt".into(), self.updated_at.to_rfc3339().into());
        props
    }

    fn from_entity(entity: TableEntity) -> PortResult<Self> {
        let (_, parts) = split_row_key(&entity.row_key);
        let props = &entity.properties;
        Ok(Book {
            id: parts.join("_"),
            title: text(props, "title"),
            genre: text(props, "globalGenre"),
            mood: text(props, "globalMood"),
            created_at: timestamp(props, "createdAt")?,
            updated_at: timestamp(props, "updatedAt")?,
        })
    }
}

impl TableRow for Character {
    const ENTITY: &'static str = "Character";

    fn row_key(&self) -> String {
        Character::row_key(self)
    }

    fn to_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("name".into(), self.name.clone().into());
        props.insert("description".into(), self.description.clone().into());
        props.insert("traits".into(), self.traits.clone().into());
        props.insert("motivation".into(), self.motivation.clone().into());
        props.insert("isActive".into(), self.is_active.into());
        props
    }

    fn from_entity(entity: TableEntity) -> PortResult<Self> {
        let (book_id, id) = scoped_ids(&entity)?;
        let props = &entity.properties;
        Ok(Character {
            id,
            book_id,
            name: text(props, "name"),
            description: text(props, "description"),
            traits: text(props, "traits"),
            motivation: text(props, "motivation"),
            is_active: props.get("isActive").and_then(Value::as_bool).unwrap_or(true),
        })
    }
}

impl TableRow for Location {
    const ENTITY: &'static str = "Location";

    fn row_key(&self) -> String {
        Location::row_key(self)
    }

    fn to_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("name".into(), self.name.clone().into());
        props.insert("description".into(), self.description.clone().into());
        props.insert("atmosphere".into(), self.atmosphere.clone().into());
        props
    }

    fn from_entity(entity: TableEntity) -> PortResult<Self> {
        let (book_id, id) = scoped_ids(&entity)?;
        let props = &entity.properties;
        Ok(Location {
            id,
            book_id,
            name: text(props, "name"),
            description: text(props, "description"),
            atmosphere: text(props, "atmosphere"),
        })
    }
}

impl TableRow for WorldRule {
    const ENTITY: &'static str = "World rule";

    fn row_key(&self) -> String {
        keys::world_rule_key(&self.book_id, &self.id)
    }

    fn to_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("title".into(), self.title.clone().into());
        props.insert("description".into(), self.description.clone().into());
        props
    }

    fn from_entity(entity: TableEntity) -> PortResult<Self> {
        let (book_id, id) = scoped_ids(&entity)?;
        let props = &entity.properties;
        Ok(WorldRule {
            id,
            book_id,
            title: text(props, "title"),
            description: text(props, "description"),
        })
    }
}

impl TableRow for Page {
    const ENTITY: &'static str = "Page";

    fn row_key(&self) -> String {
        keys::page_key(&self.book_id, self.page_nr)
    }

    fn to_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("userNote".into(), self.user_note.clone().into());
        props.insert("targetMood".into(), self.target_mood.clone().into());
        props.insert("orderIndex".into(), self.order_index.into());
        insert_chunks(&mut props, &self.content);
        props
    }

    fn from_entity(entity: TableEntity) -> PortResult<Self> {
        let (book_id, nr) = scoped_ids(&entity)?;
        let page_nr = nr.parse().map_err(|_| {
            PortError::Unexpected(format!("Malformed page row key: {}", entity.row_key))
        })?;
        let props = &entity.properties;
        Ok(Page {
            book_id,
            page_nr,
            user_note: text(props, "userNote"),
            target_mood: text(props, "targetMood"),
            order_index: number(props, "orderIndex"),
            content: reassemble_content(props),
        })
    }
}

impl TableRow for RollingSummary {
    const ENTITY: &'static str = "Summary";

    fn row_key(&self) -> String {
        keys::summary_key(&self.book_id)
    }

    fn to_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("rollingSummary".into(), self.rolling_summary.clone().into());
        props.insert("lastPageIndex".into(), self.last_page_index.into());
        props
    }

    fn from_entity(entity: TableEntity) -> PortResult<Self> {
        let (_, parts) = split_row_key(&entity.row_key);
        let props = &entity.properties;
        Ok(RollingSummary {
            book_id: parts.join("_"),
            rolling_summary: text(props, "rollingSummary"),
            last_page_index: number(props, "lastPageIndex"),
        })
    }
}

/// The highest page number a book has handed out, deleted pages included.
struct PageSequence {
    book_id: String,
    last_page_nr: u32,
}

impl TableRow for PageSequence {
    const ENTITY: &'static str = "Page sequence";

    fn row_key(&self) -> String {
        keys::page_sequence_key(&self.book_id)
    }

    fn to_properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("lastPageNr".into(), self.last_page_nr.into());
        props
    }

    fn from_entity(entity: TableEntity) -> PortResult<Self> {
        let (_, parts) = split_row_key(&entity.row_key);
        Ok(PageSequence {
            book_id: parts.join("_"),
            last_page_nr: number(&entity.properties, "lastPageNr"),
        })
    }
}

fn text(props: &Map<String, Value>, key: &str) -> String {
    props
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn number(props: &Map<String, Value>, key: &str) -> u32 {
    props
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or_default()
}

fn timestamp(props: &Map<String, Value>, key: &str) -> PortResult<DateTime<Utc>> {
    let raw = text(props, key);
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PortError::Unexpected(format!("Invalid {} '{}': {}", key, raw, e)))
}

/// Splits `TAG_{bookId}_{id}` into `(bookId, id)`.
fn scoped_ids(entity: &TableEntity) -> PortResult<(String, String)> {
    let (_, parts) = split_row_key(&entity.row_key);
    match parts.split_first() {
        Some((book_id, rest)) if !rest.is_empty() => Ok((book_id.to_string(), rest.join("_"))),
        _ => Err(PortError::Unexpected(format!(
            "Malformed row key: {}",
            entity.row_key
        ))),
    }
}

fn not_found_as(entity: &'static str) -> impl Fn(PortError) -> PortError {
    move |error| match error {
        PortError::NotFound(_) => PortError::NotFound(format!("{} not found", entity)),
        other => other,
    }
}

/// The number for the next page of a book: one past both the page count and
/// the highest number in use, so a live page is never overwritten.
/// `append_page` raises it further past numbers of deleted pages.
pub fn next_page_nr(existing: &[Page]) -> u32 {
    let count = u32::try_from(existing.len()).unwrap_or(u32::MAX);
    let highest = existing.iter().map(|p| p.page_nr).max().unwrap_or(0);
    count.max(highest).saturating_add(1)
}

//=========================================================================================
// The Repository
//=========================================================================================

/// Typed CRUD over every entity of a user's partition.
#[derive(Clone)]
pub struct StoryRepository {
    store: Arc<dyn TableStore>,
}

impl StoryRepository {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    async fn fetch<T: TableRow>(&self, user_id: &str, row_key: &str) -> PortResult<T> {
        let entity = self
            .store
            .get_entity(&keys::partition_key(user_id), row_key)
            .await
            .map_err(not_found_as(T::ENTITY))?;
        T::from_entity(entity)
    }

    async fn fetch_all<T: TableRow>(&self, user_id: &str, prefix: &str) -> PortResult<Vec<T>> {
        let entities = self
            .store
            .list_entities(&keys::partition_key(user_id), &prefix_range(prefix))
            .await?;
        entities.into_iter().map(T::from_entity).collect()
    }

    fn to_entity<T: TableRow>(user_id: &str, row: &T) -> TableEntity {
        TableEntity {
            partition_key: keys::partition_key(user_id),
            row_key: row.row_key(),
            properties: row.to_properties(),
        }
    }

    async fn insert<T: TableRow>(&self, user_id: &str, row: &T) -> PortResult<()> {
        self.store.create_entity(Self::to_entity(user_id, row)).await
    }

    /// Overwrites the stored row wholesale, so no stale properties survive.
    async fn replace<T: TableRow>(&self, user_id: &str, row: &T) -> PortResult<()> {
        self.store
            .update_entity(Self::to_entity(user_id, row), UpdateMode::Replace)
            .await
            .map_err(not_found_as(T::ENTITY))
    }

    async fn remove<T: TableRow>(&self, user_id: &str, row_key: &str) -> PortResult<()> {
        self.store
            .delete_entity(&keys::partition_key(user_id), row_key)
            .await
            .map_err(not_found_as(T::ENTITY))
    }

    // --- Books ---

    pub async fn list_books(&self, user_id: &str) -> PortResult<Vec<Book>> {
        self.fetch_all(user_id, &scope_prefix(RowKind::Book, &[])).await
    }

    pub async fn get_book(&self, user_id: &str, book_id: &str) -> PortResult<Book> {
        self.fetch(user_id, &keys::book_key(book_id)).await
    }

    pub async fn create_book(&self, user_id: &str, book: &Book) -> PortResult<()> {
        self.insert(user_id, book).await
    }

    pub async fn replace_book(&self, user_id: &str, book: &Book) -> PortResult<()> {
        self.replace(user_id, book).await
    }

    /// Deletes only the book row; its characters, pages etc. are left in place.
    pub async fn delete_book(&self, user_id: &str, book_id: &str) -> PortResult<()> {
        self.remove::<Book>(user_id, &keys::book_key(book_id)).await
    }

    // --- Characters ---

    pub async fn list_characters(&self, user_id: &str, book_id: &str) -> PortResult<Vec<Character>> {
        self.fetch_all(user_id, &scope_prefix(RowKind::Character, &[book_id]))
            .await
    }

    pub async fn get_character(
        &self,
        user_id: &str,
        book_id: &str,
        char_id: &str,
    ) -> PortResult<Character> {
        self.fetch(user_id, &keys::character_key(book_id, char_id)).await
    }

    pub async fn create_character(&self, user_id: &str, character: &Character) -> PortResult<()> {
        self.insert(user_id, character).await
    }

    pub async fn replace_character(&self, user_id: &str, character: &Character) -> PortResult<()> {
        self.replace(user_id, character).await
    }

    pub async fn delete_character(
        &self,
        user_id: &str,
        book_id: &str,
        char_id: &str,
    ) -> PortResult<()> {
        self.remove::<Character>(user_id, &keys::character_key(book_id, char_id))
            .await
    }

    // --- Locations ---

    pub async fn list_locations(&self, user_id: &str, book_id: &str) -> PortResult<Vec<Location>> {
        self.fetch_all(user_id, &scope_prefix(RowKind::Location, &[book_id]))
            .await
    }

    pub async fn get_location(
        &self,
        user_id: &str,
        book_id: &str,
        loc_id: &str,
    ) -> PortResult<Location> {
        self.fetch(user_id, &keys::location_key(book_id, loc_id)).await
    }

    pub async fn create_location(&self, user_id: &str, location: &Location) -> PortResult<()> {
        self.insert(user_id, location).await
    }

    pub async fn replace_location(&self, user_id: &str, location: &Location) -> PortResult<()> {
        self.replace(user_id, location).await
    }

    pub async fn delete_location(
        &self,
        user_id: &str,
        book_id: &str,
        loc_id: &str,
    ) -> PortResult<()> {
        self.remove::<Location>(user_id, &keys::location_key(book_id, loc_id))
            .await
    }

    // --- World rules ---

    pub async fn list_world_rules(&self, user_id: &str, book_id: &str) -> PortResult<Vec<WorldRule>> {
        self.fetch_all(user_id, &scope_prefix(RowKind::WorldRule, &[book_id]))
            .await
    }

    pub async fn get_world_rule(
        &self,
        user_id: &str,
        book_id: &str,
        rule_id: &str,
    ) -> PortResult<WorldRule> {
        self.fetch(user_id, &keys::world_rule_key(book_id, rule_id)).await
    }

    pub async fn create_world_rule(&self, user_id: &str, rule: &WorldRule) -> PortResult<()> {
        self.insert(user_id, rule).await
    }

    pub async fn replace_world_rule(&self, user_id: &str, rule: &WorldRule) -> PortResult<()> {
        self.replace(user_id, rule).await
    }

    pub async fn delete_world_rule(
        &self,
        user_id: &str,
        book_id: &str,
        rule_id: &str,
    ) -> PortResult<()> {
        self.remove::<WorldRule>(user_id, &keys::world_rule_key(book_id, rule_id))
            .await
    }

    // --- Pages ---

    /// Lists a book's pages in row-key (page number) order; callers that need
    /// story order sort by `order_index`.
    pub async fn list_pages(&self, user_id: &str, book_id: &str) -> PortResult<Vec<Page>> {
        self.fetch_all(user_id, &scope_prefix(RowKind::Page, &[book_id]))
            .await
    }

    pub async fn get_page(&self, user_id: &str, book_id: &str, page_nr: u32) -> PortResult<Page> {
        self.fetch(user_id, &keys::page_key(book_id, page_nr)).await
    }

    pub async fn replace_page(&self, user_id: &str, page: &Page) -> PortResult<()> {
        self.replace(user_id, page).await
    }

    pub async fn delete_page(&self, user_id: &str, book_id: &str, page_nr: u32) -> PortResult<()> {
        self.remove::<Page>(user_id, &keys::page_key(book_id, page_nr))
            .await
    }

    /// Stores `page` under its own number, or under the next free number when a
    /// concurrent writer already claimed it. Numbers at or below the book's
    /// recorded high-water mark are skipped, so a deleted page's number is never
    /// handed out again. `order_index` always follows the number the page finally
    /// lands on.
    pub async fn append_page(&self, user_id: &str, mut page: Page) -> PortResult<Page> {
        let last_issued = self.last_page_nr(user_id, &page.book_id).await?;
        page.page_nr = page.page_nr.max(last_issued.saturating_add(1));

        for attempt in 1..=PAGE_CREATE_ATTEMPTS {
            page.order_index = page.page_nr;
            match self.insert(user_id, &page).await {
                Ok(()) => {
                    // A failed mark does not undo the stored page.
                    if let Err(e) = self
                        .record_page_nr(user_id, &page.book_id, page.page_nr)
                        .await
                    {
                        warn!(
                            "Could not record page number {} for book {}: {}",
                            page.page_nr, page.book_id, e
                        );
                    }
                    return Ok(page);
                }
                Err(PortError::Conflict(key)) if attempt < PAGE_CREATE_ATTEMPTS => {
                    warn!("Page {} already exists, retrying with the next number.", key);
                    page.page_nr += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Err(PortError::Conflict(format!(
            "No free page number for book {}",
            page.book_id
        )))
    }

    /// The highest page number ever stored for the book, 0 if none was recorded.
    async fn last_page_nr(&self, user_id: &str, book_id: &str) -> PortResult<u32> {
        match self
            .fetch::<PageSequence>(user_id, &keys::page_sequence_key(book_id))
            .await
        {
            Ok(sequence) => Ok(sequence.last_page_nr),
            Err(PortError::NotFound(_)) => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Raises the book's high-water mark to `page_nr`. Never lowers it.
    async fn record_page_nr(&self, user_id: &str, book_id: &str, page_nr: u32) -> PortResult<()> {
        let sequence = PageSequence {
            book_id: book_id.to_string(),
            last_page_nr: page_nr,
        };
        if self.last_page_nr(user_id, book_id).await? >= page_nr {
            return Ok(());
        }
        match self.insert(user_id, &sequence).await {
            Err(PortError::Conflict(_)) => self.replace(user_id, &sequence).await,
            other => other,
        }
    }

    // --- Rolling summary ---

    /// Returns the book's summary, or `None` before the first page completes.
    pub async fn get_summary(&self, user_id: &str, book_id: &str) -> PortResult<Option<RollingSummary>> {
        match self.fetch(user_id, &keys::summary_key(book_id)).await {
            Ok(summary) => Ok(Some(summary)),
            Err(PortError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Creates the summary record, or replaces it wholesale if one exists.
    pub async fn put_summary(&self, user_id: &str, summary: &RollingSummary) -> PortResult<()> {
        match self.insert(user_id, summary).await {
            Err(PortError::Conflict(_)) => self.replace(user_id, summary).await,
            other => other,
        }
    }
}
