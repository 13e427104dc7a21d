//! services/api/src/web/page_task.rs
//!
//! The page generation and page edit workflows: load the book's context,
//! assemble a prompt, call the story model and persist the result.

use crate::web::{state::AppState, summary_task::spawn_summary_update};
use saga_core::{
    domain::{Book, Character, Location, Page, PageBeat, RollingSummary, WorldRule},
    hashtag::strip_hashtags,
    mentions::resolve_mentions,
    ports::PortResult,
    prompt::{build_edit_prompt, build_page_prompt, recent_pages_window, PromptContext},
    repository::{next_page_nr, StoryRepository},
};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::info;

/// The result of a successful generation. The page is already stored; the
/// summary update keeps running in the background.
pub struct GeneratedPage {
    pub page: Page,
    pub summary_task: JoinHandle<()>,
}

/// Everything a prompt needs about one book, loaded in parallel.
struct StoryContext {
    book: Book,
    characters: Vec<Character>,
    locations: Vec<Location>,
    world_rules: Vec<WorldRule>,
    summary: Option<RollingSummary>,
    pages: Vec<Page>,
}

impl StoryContext {
    async fn load(repo: &StoryRepository, user_id: &str, book_id: &str) -> PortResult<Self> {
        let (book, characters, locations, world_rules, summary, pages) = tokio::try_join!(
            repo.get_book(user_id, book_id),
            repo.list_characters(user_id, book_id),
            repo.list_locations(user_id, book_id),
            repo.list_world_rules(user_id, book_id),
            repo.get_summary(user_id, book_id),
            repo.list_pages(user_id, book_id),
        )?;

        Ok(Self {
            book,
            characters,
            locations,
            world_rules,
            summary,
            pages,
        })
    }

    fn prompt_context<'a>(
        &'a self,
        recent_pages: &'a [Page],
        user_note: &'a str,
        target_mood: &'a str,
        mentioned_names: &'a [String],
    ) -> PromptContext<'a> {
        PromptContext {
            genre: &self.book.genre,
            mood: &self.book.mood,
            world_rules: &self.world_rules,
            characters: &self.characters,
            locations: &self.locations,
            summary: self.summary.as_ref(),
            recent_pages,
            user_note,
            target_mood,
            mentioned_names,
        }
    }
}

/// Writes the next page of a book from the user's beat.
///
/// Fails with `NotFound` when the book does not exist and with `QuotaExceeded`
/// when the model refuses for quota reasons; nothing is stored in either case.
/// Once the page is stored, the rolling summary is updated by a detached task.
pub async fn generate_page(
    app_state: Arc<AppState>,
    user_id: &str,
    book_id: &str,
    beat: PageBeat,
) -> PortResult<GeneratedPage> {
    let start_time = Instant::now();
    info!("Generating the next page for book {}.", book_id);

    let mut story = StoryContext::load(&app_state.repo, user_id, book_id).await?;
    let page_nr = next_page_nr(&story.pages);
    let recent = recent_pages_window(std::mem::take(&mut story.pages), None);

    let mentioned = resolve_mentions(
        &beat.user_note,
        &beat.mentioned_entities,
        &story.characters,
        &story.locations,
    );
    let user_note = strip_hashtags(&beat.user_note);
    let prompt = build_page_prompt(&story.prompt_context(
        &recent,
        &user_note,
        &beat.target_mood,
        &mentioned,
    ));

    let llm_start = Instant::now();
    let content = app_state.story_model.generate(&prompt).await?;
    info!("⏱️ Story model took: {:?}", llm_start.elapsed());

    let page = app_state
        .repo
        .append_page(
            user_id,
            Page {
                book_id: book_id.to_string(),
                page_nr,
                user_note: beat.user_note,
                target_mood: beat.target_mood,
                order_index: page_nr,
                content,
            },
        )
        .await?;
    info!(
        "Stored page {} of book {} ({} chars) in {:?}.",
        page.page_nr,
        book_id,
        page.content.chars().count(),
        start_time.elapsed()
    );

    let summary_task = spawn_summary_update(
        app_state.clone(),
        user_id.to_string(),
        story.summary,
        page.clone(),
    );

    Ok(GeneratedPage { page, summary_task })
}

/// Rewrites an existing page in place from a revision instruction.
///
/// The page keeps its number and `order_index`; its note, mood and content are
/// replaced. The rolling summary is left as it is.
pub async fn edit_page(
    app_state: &AppState,
    user_id: &str,
    book_id: &str,
    page_nr: u32,
    beat: PageBeat,
) -> PortResult<Page> {
    let start_time = Instant::now();
    info!("Revising page {} of book {}.", page_nr, book_id);

    let current = app_state.repo.get_page(user_id, book_id, page_nr).await?;
    let mut story = StoryContext::load(&app_state.repo, user_id, book_id).await?;
    let recent = recent_pages_window(std::mem::take(&mut story.pages), Some(page_nr));

    let mentioned = resolve_mentions(
        &beat.user_note,
        &beat.mentioned_entities,
        &story.characters,
        &story.locations,
    );
    let user_note = strip_hashtags(&beat.user_note);
    let prompt = build_edit_prompt(
        &story.prompt_context(&recent, &user_note, &beat.target_mood, &mentioned),
        &current,
    );

    let content = app_state.story_model.generate(&prompt).await?;

    let revised = Page {
        user_note: beat.user_note,
        target_mood: beat.target_mood,
        content,
        ..current
    };
    app_state.repo.replace_page(user_id, &revised).await?;
    info!(
        "Revised page {} of book {} in {:?}.",
        page_nr,
        book_id,
        start_time.elapsed()
    );

    Ok(revised)
}
