//! services/api/src/web/pages.rs
//!
//! REST handlers for pages and the rolling summary. Generation and revision
//! delegate to the workflows in `page_task`.

use crate::error::ApiResult;
use crate::web::{
    middleware::UserId,
    page_task::{edit_page, generate_page},
    protocol::{BeatRequest, PageResponse, SummaryResponse, UpdatePageRequest},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::info;

/// List a book's pages in story order.
#[utoipa::path(
    get,
    path = "/books/{book_id}/pages",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id.")
    ),
    responses((status = 200, description = "Pages sorted by orderIndex.", body = [PageResponse])),
    tag = "pages"
)]
pub async fn list_pages_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<Vec<PageResponse>>> {
    let mut pages = app_state.repo.list_pages(&user_id, &book_id).await?;
    pages.sort_by_key(|page| page.order_index);
    Ok(Json(pages.into_iter().map(PageResponse::from).collect()))
}

/// Generate the next page of a book from a beat.
///
/// The page is stored before the response is sent. The rolling summary is
/// updated afterwards in the background.
#[utoipa::path(
    post,
    path = "/books/{book_id}/pages/generate",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id.")
    ),
    request_body = BeatRequest,
    responses(
        (status = 201, description = "The new page.", body = PageResponse),
        (status = 404, description = "Book not found."),
        (status = 429, description = "The model quota is exhausted.")
    ),
    tag = "pages"
)]
pub async fn generate_page_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(book_id): Path<String>,
    Json(payload): Json<BeatRequest>,
) -> ApiResult<(StatusCode, Json<PageResponse>)> {
    let generated = generate_page(app_state, &user_id, &book_id, payload.into()).await?;
    Ok((StatusCode::CREATED, Json(generated.page.into())))
}

/// Rewrite an existing page from a revision instruction.
#[utoipa::path(
    post,
    path = "/books/{book_id}/pages/{page_nr}/edit",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("page_nr" = u32, Path, description = "The page number.")
    ),
    request_body = BeatRequest,
    responses(
        (status = 200, description = "The revised page.", body = PageResponse),
        (status = 404, description = "Page or book not found."),
        (status = 429, description = "The model quota is exhausted.")
    ),
    tag = "pages"
)]
pub async fn edit_page_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, page_nr)): Path<(String, u32)>,
    Json(payload): Json<BeatRequest>,
) -> ApiResult<Json<PageResponse>> {
    let page = edit_page(&app_state, &user_id, &book_id, page_nr, payload.into()).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/books/{book_id}/pages/{page_nr}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("page_nr" = u32, Path, description = "The page number.")
    ),
    responses(
        (status = 200, description = "The page.", body = PageResponse),
        (status = 404, description = "Page not found.")
    ),
    tag = "pages"
)]
pub async fn get_page_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, page_nr)): Path<(String, u32)>,
) -> ApiResult<Json<PageResponse>> {
    let page = app_state.repo.get_page(&user_id, &book_id, page_nr).await?;
    Ok(Json(page.into()))
}

/// Hand-edit a page. Omitted fields keep their value; the page's position never changes.
#[utoipa::path(
    patch,
    path = "/books/{book_id}/pages/{page_nr}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("page_nr" = u32, Path, description = "The page number.")
    ),
    request_body = UpdatePageRequest,
    responses(
        (status = 200, description = "The updated page.", body = PageResponse),
        (status = 404, description = "Page not found.")
    ),
    tag = "pages"
)]
pub async fn update_page_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, page_nr)): Path<(String, u32)>,
    Json(payload): Json<UpdatePageRequest>,
) -> ApiResult<Json<PageResponse>> {
    let mut page = app_state.repo.get_page(&user_id, &book_id, page_nr).await?;
    if let Some(content) = payload.content {
        page.content = content;
    }
    if let Some(user_note) = payload.user_note {
        page.user_note = user_note;
    }
    if let Some(target_mood) = payload.target_mood {
        page.target_mood = target_mood;
    }

    app_state.repo.replace_page(&user_id, &page).await?;
    Ok(Json(page.into()))
}

/// Delete a page. Its number is never handed out again.
#[utoipa::path(
    delete,
    path = "/books/{book_id}/pages/{page_nr}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id."),
        ("page_nr" = u32, Path, description = "The page number.")
    ),
    responses(
        (status = 204, description = "Page deleted."),
        (status = 404, description = "Page not found.")
    ),
    tag = "pages"
)]
pub async fn delete_page_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path((book_id, page_nr)): Path<(String, u32)>,
) -> ApiResult<StatusCode> {
    app_state
        .repo
        .delete_page(&user_id, &book_id, page_nr)
        .await?;
    info!("Deleted page {} of book {}.", page_nr, book_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Get the rolling summary of a book, or an empty one if no page has been summarized yet.
#[utoipa::path(
    get,
    path = "/books/{book_id}/summary",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id.")
    ),
    responses((status = 200, description = "The rolling summary.", body = SummaryResponse)),
    tag = "pages"
)]
pub async fn get_summary_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<SummaryResponse>> {
    let summary = app_state.repo.get_summary(&user_id, &book_id).await?;
    Ok(Json(match summary {
        Some(summary) => summary.into(),
        None => SummaryResponse::empty(book_id),
    }))
}
