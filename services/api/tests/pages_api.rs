mod common;

use api_lib::{
    error::{INTERNAL_ERROR_MESSAGE, QUOTA_EXCEEDED_MESSAGE},
    web::{page_task::generate_page, summary_task::update_rolling_summary},
};
use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::*;
use saga_core::{Page, PageBeat, PortError, RollingSummary};
use serde_json::json;

fn beat(note: &str) -> serde_json::Value {
    json!({ "userNote": note, "targetMood": "tense" })
}

async fn generate(app: &TestApp, book_id: &str, note: &str) -> serde_json::Value {
    let (status, body) = post_json(
        &app.router,
        &format!("/books/{}/pages/generate", book_id),
        beat(note),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", body);
    body
}

#[tokio::test]
async fn pages_are_numbered_sequentially_and_never_reused() {
    let app = build_test_app();
    let book_id = create_book(&app.router, "Sequence").await;

    for expected in 1..=3 {
        let page = generate(&app, &book_id, "Something happens").await;
        assert_eq!(page["pageNr"], expected);
        assert_eq!(page["orderIndex"], expected);
    }

    let (status, _) = delete(&app.router, &format!("/books/{}/pages/2", book_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let page = generate(&app, &book_id, "After the gap").await;
    assert_eq!(page["pageNr"], 4);

    let (_, pages) = get(&app.router, &format!("/books/{}/pages", book_id)).await;
    let order: Vec<u64> = pages
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["orderIndex"].as_u64().unwrap())
        .collect();
    assert_eq!(order, vec![1, 3, 4]);
}

#[tokio::test]
async fn deleting_the_last_page_does_not_free_its_number() {
    let app = build_test_app();
    let book_id = create_book(&app.router, "High water").await;
    for _ in 1..=3 {
        generate(&app, &book_id, "Something happens").await;
    }

    let (status, _) = delete(&app.router, &format!("/books/{}/pages/3", book_id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let page = generate(&app, &book_id, "A new ending").await;
    assert_eq!(page["pageNr"], 4);
    assert_eq!(page["orderIndex"], 4);

    let (status, _) = get(&app.router, &format!("/books/{}/pages/3", book_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn generation_resolves_mentions_and_strips_hashtags() {
    let app = build_test_app();
    let book_id = create_book(&app.router, "Mentions").await;
    post_json(
        &app.router,
        &format!("/books/{}/characters", book_id),
        json!({ "name": "Erik", "description": "A young smith" }),
    )
    .await;
    let (_, location) = post_json(
        &app.router,
        &format!("/books/{}/locations", book_id),
        json!({ "name": "Deep Forest", "description": "Ancient pines", "atmosphere": "hushed" }),
    )
    .await;
    app.story_model.reply("Erik stepped between the pines.");

    let (status, page) = post_json(
        &app.router,
        &format!("/books/{}/pages/generate", book_id),
        json!({
            "userNote": "#Erik enters the #DeepForest",
            "mentionedEntities": [location["locId"]],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(page["content"], "Erik stepped between the pines.");
    assert_eq!(page["userNote"], "#Erik enters the #DeepForest");

    let prompt = app.story_model.last_prompt();
    assert!(prompt.system_instruction.contains("## Characters\n- **Erik**: A young smith"));
    assert!(prompt.system_instruction.contains("## Locations"));
    assert!(prompt
        .user_message
        .contains("## Next Beat\nErik enters the DeepForest"));
    assert!(prompt
        .user_message
        .ends_with("Focus on these entities: Erik, Deep Forest"));
    assert!(!prompt.user_message.contains("Target mood"));
}

#[tokio::test]
async fn generation_for_missing_book_is_not_found() {
    let app = build_test_app();

    let (status, body) = post_json(&app.router, "/books/ghost/pages/generate", beat("Hello")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Book not found");
    assert!(app.story_model.prompts().is_empty());
}

#[tokio::test]
async fn quota_failure_is_reported_as_429_and_stores_nothing() {
    let app = build_test_app();
    let book_id = create_book(&app.router, "Quota").await;
    app.story_model
        .fail(PortError::QuotaExceeded("Resource has been exhausted (quota)".into()));

    let (status, body) = post_json(
        &app.router,
        &format!("/books/{}/pages/generate", book_id),
        beat("Anything"),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], QUOTA_EXCEEDED_MESSAGE);

    let (_, pages) = get(&app.router, &format!("/books/{}/pages", book_id)).await;
    assert_eq!(pages, json!([]));
    assert!(app.summary_model.prompts().is_empty());
}

#[tokio::test]
async fn other_model_failures_are_internal_errors() {
    let app = build_test_app();
    let book_id = create_book(&app.router, "Broken").await;
    app.story_model
        .fail(PortError::Unexpected("connection reset".into()));

    let (status, body) = post_json(
        &app.router,
        &format!("/books/{}/pages/generate", book_id),
        beat("Anything"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], INTERNAL_ERROR_MESSAGE);
}

#[tokio::test]
async fn rolling_summary_is_replaced_after_each_page() {
    let app = build_test_app();
    let book_id = create_book(&app.router, "Summaries").await;

    app.summary_model.reply("Summary one");
    let first = generate_page(app.state.clone(), USER, &book_id, PageBeat {
        user_note: "Opening".into(),
        ..PageBeat::default()
    })
    .await
    .unwrap();
    first.summary_task.await.unwrap();

    app.summary_model.reply("Summary two");
    let second = generate_page(app.state.clone(), USER, &book_id, PageBeat {
        user_note: "Rising action".into(),
        ..PageBeat::default()
    })
    .await
    .unwrap();
    second.summary_task.await.unwrap();

    let (status, summary) = get(&app.router, &format!("/books/{}/summary", book_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["rollingSummary"], "Summary two");
    assert_eq!(summary["lastPageIndex"], 2);

    let summary_prompts = app.summary_model.prompts();
    assert!(summary_prompts[0]
        .user_message
        .contains("(No summary yet, this is the first page)"));
    assert!(summary_prompts[1]
        .user_message
        .contains("## Current Summary\nSummary one"));
    assert!(summary_prompts[1].user_message.contains("## New Page (Page 2)"));

    let story_prompt = app.story_model.last_prompt();
    assert!(story_prompt.user_message.contains("## Story So Far\nSummary one"));
    assert!(story_prompt.user_message.contains("### Page 1\nGenerated text 1"));
}

#[tokio::test]
async fn summary_failure_is_counted_but_page_is_kept() {
    let app = build_test_app();
    let book_id = create_book(&app.router, "Silent failure").await;
    app.summary_model
        .fail(PortError::Unexpected("summary model down".into()));

    let generated = generate_page(app.state.clone(), USER, &book_id, PageBeat {
        user_note: "Begin".into(),
        ..PageBeat::default()
    })
    .await
    .unwrap();
    generated.summary_task.await.unwrap();

    assert_eq!(app.state.summary_failures(), 1);
    let (_, health) = send(&app.router, "GET", "/health", None, None).await;
    assert_eq!(health["summaryFailures"], 1);

    let (status, page) = get(&app.router, &format!("/books/{}/pages/1", book_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["content"], generated.page.content);

    let (_, summary) = get(&app.router, &format!("/books/{}/summary", book_id)).await;
    assert_eq!(
        summary,
        json!({ "bookId": book_id, "rollingSummary": "", "lastPageIndex": 0 })
    );
}

#[tokio::test]
async fn older_page_does_not_overwrite_a_newer_summary() {
    let app = build_test_app();
    let newer = RollingSummary {
        book_id: "b1".into(),
        rolling_summary: "Up to page five".into(),
        last_page_index: 5,
    };
    app.state.repo.put_summary(USER, &newer).await.unwrap();

    let late_page = Page {
        book_id: "b1".into(),
        page_nr: 3,
        user_note: String::new(),
        target_mood: String::new(),
        order_index: 3,
        content: "Page three".into(),
    };
    let outcome = update_rolling_summary(&app.state, USER, None, &late_page).await;
    assert_matches!(outcome, Ok(None));

    let stored = app.state.repo.get_summary(USER, "b1").await.unwrap();
    assert_eq!(stored, Some(newer));
}

#[tokio::test]
async fn editing_a_page_keeps_its_position_and_hides_it_from_recent_pages() {
    let app = build_test_app();
    let book_id = create_book(&app.router, "Revisions").await;
    for text in ["First page text", "Second page text", "Third page text"] {
        app.story_model.reply(text);
        generate(&app, &book_id, "Continue").await;
    }

    app.story_model.reply("Second page, revised");
    let (status, page) = post_json(
        &app.router,
        &format!("/books/{}/pages/2/edit", book_id),
        json!({ "userNote": "Make it rain", "targetMood": "melancholic" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pageNr"], 2);
    assert_eq!(page["orderIndex"], 2);
    assert_eq!(page["content"], "Second page, revised");
    assert_eq!(page["userNote"], "Make it rain");

    let prompt = app.story_model.last_prompt();
    assert!(prompt.system_instruction.contains("creative fiction editor"));
    assert!(prompt.user_message.contains("### Page 1\nFirst page text"));
    assert!(prompt.user_message.contains("### Page 3\nThird page text"));
    assert!(!prompt.user_message.contains("### Page 2"));
    assert!(prompt
        .user_message
        .contains("## Current Page (Page 2)\nSecond page text"));
    assert!(prompt
        .user_message
        .contains("## Next Beat\nMake it rain\nTarget mood: melancholic"));

    let (_, pages) = get(&app.router, &format!("/books/{}/pages", book_id)).await;
    let order: Vec<u64> = pages
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["orderIndex"].as_u64().unwrap())
        .collect();
    assert_eq!(order, vec![1, 2, 3]);
}

#[tokio::test]
async fn editing_a_missing_page_is_not_found() {
    let app = build_test_app();
    let book_id = create_book(&app.router, "Nothing yet").await;

    let (status, body) = post_json(
        &app.router,
        &format!("/books/{}/pages/9/edit", book_id),
        beat("Rewrite"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Page not found");
    assert!(app.story_model.prompts().is_empty());
}

#[tokio::test]
async fn patching_a_page_replaces_content_but_not_position() {
    let app = build_test_app();
    let book_id = create_book(&app.router, "Hand edits").await;
    generate(&app, &book_id, "Start").await;

    let long_text = "x".repeat(130_000);
    let uri = format!("/books/{}/pages/1", book_id);
    let (status, page) = patch_json(&app.router, &uri, json!({ "content": long_text })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["orderIndex"], 1);

    let (_, page) = patch_json(&app.router, &uri, json!({ "content": "short again" })).await;
    assert_eq!(page["content"], "short again");

    let (_, page) = get(&app.router, &uri).await;
    assert_eq!(page["content"], "short again");
    assert_eq!(page["userNote"], "Start");

    let (status, _) = patch_json(
        &app.router,
        &format!("/books/{}/pages/7", book_id),
        json!({ "content": "nope" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_of_a_fresh_book_is_empty() {
    let app = build_test_app();
    let book_id = create_book(&app.router, "Blank").await;

    let (status, summary) = get(&app.router, &format!("/books/{}/summary", book_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        summary,
        json!({ "bookId": book_id, "rollingSummary": "", "lastPageIndex": 0 })
    );
}
