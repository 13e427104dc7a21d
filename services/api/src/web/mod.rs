pub mod books;
pub mod middleware;
pub mod page_task;
pub mod pages;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod summary_task;
pub mod world;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use middleware::require_user;
pub use state::AppState;

/// Builds the full API router. Every `/books` route requires the `x-user-id`
/// header; `/health` does not.
pub fn router(app_state: Arc<AppState>) -> Router {
    let book_routes = Router::new()
        .route(
            "/books",
            get(books::list_books_handler).post(books::create_book_handler),
        )
        .route(
            "/books/{book_id}",
            get(books::get_book_handler)
                .patch(books::update_book_handler)
                .delete(books::delete_book_handler),
        )
        .route(
            "/books/{book_id}/characters",
            get(world::list_characters_handler).post(world::create_character_handler),
        )
        .route(
            "/books/{book_id}/characters/{char_id}",
            get(world::get_character_handler)
                .patch(world::update_character_handler)
                .delete(world::delete_character_handler),
        )
        .route(
            "/books/{book_id}/locations",
            get(world::list_locations_handler).post(world::create_location_handler),
        )
        .route(
            "/books/{book_id}/locations/{loc_id}",
            get(world::get_location_handler)
                .patch(world::update_location_handler)
                .delete(world::delete_location_handler),
        )
        .route(
            "/books/{book_id}/rules",
            get(world::list_world_rules_handler).post(world::create_world_rule_handler),
        )
        .route(
            "/books/{book_id}/rules/{rule_id}",
            get(world::get_world_rule_handler)
                .patch(world::update_world_rule_handler)
                .delete(world::delete_world_rule_handler),
        )
        .route("/books/{book_id}/pages", get(pages::list_pages_handler))
        .route(
            "/books/{book_id}/pages/generate",
            post(pages::generate_page_handler),
        )
        .route(
            "/books/{book_id}/pages/{page_nr}",
            get(pages::get_page_handler)
                .patch(pages::update_page_handler)
                .delete(pages::delete_page_handler),
        )
        .route(
            "/books/{book_id}/pages/{page_nr}/edit",
            post(pages::edit_page_handler),
        )
        .route("/books/{book_id}/summary", get(pages::get_summary_handler))
        .route_layer(axum_middleware::from_fn(require_user));

    Router::new()
        .route("/health", get(rest::health_handler))
        .merge(book_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
