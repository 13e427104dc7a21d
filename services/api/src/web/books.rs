//! services/api/src/web/books.rs
//!
//! REST handlers for the books owned by the calling user.

use crate::error::ApiResult;
use crate::web::{
    middleware::UserId,
    protocol::{require_text, BookResponse, CreateBookRequest, UpdateBookRequest},
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use saga_core::domain::Book;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// List the caller's books.
#[utoipa::path(
    get,
    path = "/books",
    params(("x-user-id" = String, Header, description = "The calling user.")),
    responses(
        (status = 200, description = "All books of the user.", body = [BookResponse]),
        (status = 401, description = "Missing x-user-id header.")
    ),
    tag = "books"
)]
pub async fn list_books_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
) -> ApiResult<Json<Vec<BookResponse>>> {
    let books = app_state.repo.list_books(&user_id).await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// Create a new book with a generated id.
#[utoipa::path(
    post,
    path = "/books",
    params(("x-user-id" = String, Header, description = "The calling user.")),
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "The created book.", body = BookResponse),
        (status = 400, description = "Blank title.")
    ),
    tag = "books"
)]
pub async fn create_book_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Json(payload): Json<CreateBookRequest>,
) -> ApiResult<(StatusCode, Json<BookResponse>)> {
    require_text("title", &payload.title)?;
    let now = Utc::now();
    let book = Book {
        id: Uuid::new_v4().to_string(),
        title: payload.title,
        genre: payload.global_genre,
        mood: payload.global_mood,
        created_at: now,
        updated_at: now,
    };
    app_state.repo.create_book(&user_id, &book).await?;
    info!("Created book {} for user {}.", book.id, user_id);

    Ok((StatusCode::CREATED, Json(book.into())))
}

#[utoipa::path(
    get,
    path = "/books/{book_id}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id.")
    ),
    responses(
        (status = 200, description = "The book.", body = BookResponse),
        (status = 404, description = "Book not found.")
    ),
    tag = "books"
)]
pub async fn get_book_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(book_id): Path<String>,
) -> ApiResult<Json<BookResponse>> {
    let book = app_state.repo.get_book(&user_id, &book_id).await?;
    Ok(Json(book.into()))
}

/// Update the given fields of a book. Omitted fields keep their value.
#[utoipa::path(
    patch,
    path = "/books/{book_id}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id.")
    ),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "The updated book.", body = BookResponse),
        (status = 404, description = "Book not found.")
    ),
    tag = "books"
)]
pub async fn update_book_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(book_id): Path<String>,
    Json(payload): Json<UpdateBookRequest>,
) -> ApiResult<Json<BookResponse>> {
    let mut book = app_state.repo.get_book(&user_id, &book_id).await?;
    if let Some(title) = payload.title {
        require_text("title", &title)?;
        book.title = title;
    }
    if let Some(genre) = payload.global_genre {
        book.genre = genre;
    }
    if let Some(mood) = payload.global_mood {
        book.mood = mood;
    }
    book.updated_at = Utc::now();

    app_state.repo.replace_book(&user_id, &book).await?;
    Ok(Json(book.into()))
}

/// Delete a book. Its characters, locations, rules, pages and summary stay stored.
#[utoipa::path(
    delete,
    path = "/books/{book_id}",
    params(
        ("x-user-id" = String, Header, description = "The calling user."),
        ("book_id" = String, Path, description = "The book id.")
    ),
    responses(
        (status = 204, description = "Book deleted."),
        (status = 404, description = "Book not found.")
    ),
    tag = "books"
)]
pub async fn delete_book_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(UserId(user_id)): Extension<UserId>,
    Path(book_id): Path<String>,
) -> ApiResult<StatusCode> {
    app_state.repo.delete_book(&user_id, &book_id).await?;
    info!("Deleted book {} of user {}.", book_id, user_id);
    Ok(StatusCode::NO_CONTENT)
}
