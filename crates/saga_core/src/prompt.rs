//! crates/saga_core/src/prompt.rs
//!
//! Assembles the two-part (system + user) prompts sent to the language model
//! for page generation, page revision and rolling-summary updates.
//!
//! Layout of a page prompt:
//!
//! ```text
//! SYSTEM: genre/mood framing, length directive, world rules, characters, locations
//! USER:   story so far, recent pages, next beat (+ target mood, focus entities)
//! ```
//!
//! Assembly is deterministic: every list-derived section follows the order of
//! its source list, except pages, which are ordered by `order_index` first.

use crate::domain::{Character, Location, Page, RollingSummary, WorldRule};

/// Number of preceding pages included verbatim for prose continuity.
pub const RECENT_PAGE_WINDOW: usize = 2;

/// Upper bound, in words, requested from the summarizer.
pub const SUMMARY_WORD_LIMIT: usize = 500;

const PAGE_LENGTH_DIRECTIVE: &str = "Write approximately 500-800 words for the next page.";

/// A prompt ready to be sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub system_instruction: String,
    pub user_message: String,
}

/// Everything the page and edit prompts are built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub genre: &'a str,
    pub mood: &'a str,
    pub world_rules: &'a [WorldRule],
    pub characters: &'a [Character],
    pub locations: &'a [Location],
    pub summary: Option<&'a RollingSummary>,
    /// Already windowed, ascending by `order_index`.
    pub recent_pages: &'a [Page],
    /// The beat instruction with hashtag markers stripped.
    pub user_note: &'a str,
    pub target_mood: &'a str,
    pub mentioned_names: &'a [String],
}

/// Sorts `pages` by `order_index`, drops the page numbered `exclude` (the page
/// under revision) and keeps the last [`RECENT_PAGE_WINDOW`] pages.
pub fn recent_pages_window(mut pages: Vec<Page>, exclude: Option<u32>) -> Vec<Page> {
    pages.sort_by_key(|page| page.order_index);
    pages.retain(|page| Some(page.page_nr) != exclude);
    let skip = pages.len().saturating_sub(RECENT_PAGE_WINDOW);
    pages.split_off(skip)
}

pub fn build_page_prompt(ctx: &PromptContext<'_>) -> AssembledPrompt {
    let framing = [
        format!(
            "You are a creative fiction writer. Write in the style of a {} story with a {} mood.",
            ctx.genre, ctx.mood
        ),
        "Continue the story naturally, maintaining character voices and plot consistency."
            .to_string(),
        PAGE_LENGTH_DIRECTIVE.to_string(),
    ];

    let mut user_parts = story_context_parts(ctx);
    user_parts.push(beat_section("## Next Beat", ctx));

    AssembledPrompt {
        system_instruction: system_instruction(framing, ctx),
        user_message: user_parts.join("\n\n"),
    }
}

/// Builds the revision prompt for `current`, which must not be part of
/// `ctx.recent_pages`.
pub fn build_edit_prompt(ctx: &PromptContext<'_>, current: &Page) -> AssembledPrompt {
    let framing = [
        format!(
            "You are a creative fiction editor. Revise an existing page of a {} story with a {} mood.",
            ctx.genre, ctx.mood
        ),
        "Rewrite the current page in place so it carries the next beat, keeping its role in the plot and its continuity with the surrounding pages."
            .to_string(),
        "Keep approximately the same length (500-800 words) and return only the revised page text."
            .to_string(),
    ];

    let mut user_parts = story_context_parts(ctx);
    user_parts.push(format!(
        "## Current Page (Page {})\n{}",
        current.order_index, current.content
    ));
    user_parts.push(beat_section("## Next Beat", ctx));

    AssembledPrompt {
        system_instruction: system_instruction(framing, ctx),
        user_message: user_parts.join("\n\n"),
    }
}

/// Builds the prompt that folds a new page into the rolling summary.
pub fn build_summary_prompt(
    existing_summary: Option<&str>,
    new_page_content: &str,
    page_index: u32,
) -> AssembledPrompt {
    let system_instruction = [
        "You are a precise story summarizer.".to_string(),
        "Update the rolling summary to include the events of the new page.".to_string(),
        format!(
            "Keep the summary concise (max {} words) while preserving key plot points,",
            SUMMARY_WORD_LIMIT
        ),
        "character developments, and unresolved threads.".to_string(),
        "Write in past tense, third person.".to_string(),
    ]
    .join(" ");

    let existing = match existing_summary {
        Some(summary) if !summary.is_empty() => summary,
        _ => "(No summary yet, this is the first page)",
    };

    let page_heading = format!("## New Page (Page {})", page_index);
    let user_message = [
        "## Current Summary",
        existing,
        "",
        page_heading.as_str(),
        new_page_content,
        "",
        "## Task",
        "Write an updated rolling summary incorporating the new page events.",
    ]
    .join("\n");

    AssembledPrompt {
        system_instruction,
        user_message,
    }
}

fn system_instruction<const N: usize>(framing: [String; N], ctx: &PromptContext<'_>) -> String {
    let mut parts: Vec<String> = framing.into_iter().collect();

    if !ctx.world_rules.is_empty() {
        parts.push("\n## World Rules".to_string());
        for rule in ctx.world_rules {
            parts.push(format!("- **{}**: {}", rule.title, rule.description));
        }
    }

    if !ctx.characters.is_empty() {
        parts.push("\n## Characters".to_string());
        for character in ctx.characters {
            parts.push(character_bullet(character));
        }
    }

    if !ctx.locations.is_empty() {
        parts.push("\n## Locations".to_string());
        for location in ctx.locations {
            parts.push(format!(
                "- **{}**: {}. Atmosphere: {}",
                location.name, location.description, location.atmosphere
            ));
        }
    }

    parts.join("\n")
}

fn character_bullet(character: &Character) -> String {
    let mut fields = vec![format!("**{}**: {}", character.name, character.description)];
    if !character.traits.is_empty() {
        fields.push(format!("Traits: {}", character.traits));
    }
    if !character.motivation.is_empty() {
        fields.push(format!("Motivation: {}", character.motivation));
    }
    format!("- {}", fields.join(". "))
}

/// The "story so far" and "recent pages" sections of the user message.
fn story_context_parts(ctx: &PromptContext<'_>) -> Vec<String> {
    let mut parts = Vec::new();

    if let Some(summary) = ctx.summary.filter(|s| !s.rolling_summary.is_empty()) {
        parts.push(format!("## Story So Far\n{}", summary.rolling_summary));
    }

    if !ctx.recent_pages.is_empty() {
        parts.push("## Recent Pages".to_string());
        for page in ctx.recent_pages {
            parts.push(format!("### Page {}\n{}", page.order_index, page.content));
        }
    }

    parts
}

fn beat_section(heading: &str, ctx: &PromptContext<'_>) -> String {
    let mut lines = vec![format!("{}\n{}", heading, ctx.user_note)];
    if !ctx.target_mood.is_empty() {
        lines.push(format!("Target mood: {}", ctx.target_mood));
    }
    if !ctx.mentioned_names.is_empty() {
        lines.push(format!(
            "\nFocus on these entities: {}",
            ctx.mentioned_names.join(", ")
        ));
    }
    lines.join("\n")
}
